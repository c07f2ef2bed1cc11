/// Failure of a single dataset query.
///
/// All variants are reported to the user the same way; none is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The provider answered with a non-success HTTP status.
    QueryFailed { status: u16, status_text: String },
    /// The response body was not a point-feature collection.
    ParseFailed(String),
    /// No response was received at all (connection refused, DNS, reset).
    Transport(String),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::QueryFailed {
                status,
                status_text,
            } => {
                if status_text.is_empty() {
                    write!(f, "HTTP {status}")
                } else {
                    write!(f, "HTTP {status} {status_text}")
                }
            }
            QueryError::ParseFailed(msg) => write!(f, "malformed response: {msg}"),
            QueryError::Transport(msg) => write!(f, "request failed: {msg}"),
        }
    }
}

impl std::error::Error for QueryError {}

#[cfg(test)]
mod tests {
    use super::QueryError;

    #[test]
    fn query_failed_carries_status() {
        let e = QueryError::QueryFailed {
            status: 500,
            status_text: "Internal Server Error".to_string(),
        };
        assert_eq!(e.to_string(), "HTTP 500 Internal Server Error");
    }

    #[test]
    fn query_failed_without_reason() {
        let e = QueryError::QueryFailed {
            status: 599,
            status_text: String::new(),
        };
        assert_eq!(e.to_string(), "HTTP 599");
    }
}
