//! Bounding-box scoped queries against the brand and seismic endpoints.

use std::future::Future;
use std::pin::Pin;

use foundation::BoundingBox;
use tracing::debug;

use crate::error::QueryError;
use crate::geojson::{FeatureCollection, parse_feature_collection};

pub const DEFAULT_HOURS: f64 = 24.0;
pub const DEFAULT_MIN_MAGNITUDE: f64 = 2.5;

pub const BRAND_PATH: &str = "/api/osm/brand";
pub const SEISMIC_PATH: &str = "/api/usgs/quakes";

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Source of point features for one viewport.
///
/// Methods return boxed futures so the client can be held as a trait object.
/// A provider returning zero features yields an empty collection, not an error.
pub trait DataClient: Send + Sync {
    fn query_brand<'a>(
        &'a self,
        brand_id: &'a str,
        bbox: BoundingBox,
    ) -> BoxFuture<'a, Result<FeatureCollection, QueryError>>;

    /// `hours` and `min_magnitude` are raw user input; see [`SeismicFilter::from_inputs`].
    fn query_seismic<'a>(
        &'a self,
        hours: &'a str,
        min_magnitude: &'a str,
        bbox: BoundingBox,
    ) -> BoxFuture<'a, Result<FeatureCollection, QueryError>>;
}

/// Effective thresholds for a seismic query.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SeismicFilter {
    pub hours: f64,
    pub min_magnitude: f64,
}

impl Default for SeismicFilter {
    fn default() -> Self {
        Self {
            hours: DEFAULT_HOURS,
            min_magnitude: DEFAULT_MIN_MAGNITUDE,
        }
    }
}

impl SeismicFilter {
    /// Coerces raw input text, falling back per field when it is empty or
    /// not a finite number.
    pub fn from_inputs(hours: &str, min_magnitude: &str) -> Self {
        Self {
            hours: number_or(hours, DEFAULT_HOURS),
            min_magnitude: number_or(min_magnitude, DEFAULT_MIN_MAGNITUDE),
        }
    }
}

fn number_or(input: &str, default: f64) -> f64 {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// [`DataClient`] backed by the query proxy over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDataClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDataClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn brand_request(&self, brand_id: &str, bbox: BoundingBox) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{BRAND_PATH}", self.base_url))
            .query(&[("brand", brand_id.to_string()), ("bbox", bbox.to_string())])
    }

    pub fn seismic_request(
        &self,
        filter: SeismicFilter,
        bbox: BoundingBox,
    ) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{SEISMIC_PATH}", self.base_url))
            .query(&[
                ("hours", filter.hours.to_string()),
                ("minmag", filter.min_magnitude.to_string()),
                ("bbox", bbox.to_string()),
            ])
    }

    async fn fetch(req: reqwest::RequestBuilder) -> Result<FeatureCollection, QueryError> {
        let resp = req
            .send()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(QueryError::QueryFailed {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;
        let fc = parse_feature_collection(&body)?;
        debug!("received {} features ({} bytes)", fc.len(), body.len());
        Ok(fc)
    }
}

impl DataClient for HttpDataClient {
    fn query_brand<'a>(
        &'a self,
        brand_id: &'a str,
        bbox: BoundingBox,
    ) -> BoxFuture<'a, Result<FeatureCollection, QueryError>> {
        let req = self.brand_request(brand_id, bbox);
        Box::pin(Self::fetch(req))
    }

    fn query_seismic<'a>(
        &'a self,
        hours: &'a str,
        min_magnitude: &'a str,
        bbox: BoundingBox,
    ) -> BoxFuture<'a, Result<FeatureCollection, QueryError>> {
        let filter = SeismicFilter::from_inputs(hours, min_magnitude);
        let req = self.seismic_request(filter, bbox);
        Box::pin(Self::fetch(req))
    }
}

#[cfg(test)]
mod tests {
    use super::{DataClient, HttpDataClient, SeismicFilter};
    use crate::error::QueryError;
    use foundation::BoundingBox;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn bbox() -> BoundingBox {
        BoundingBox::new(40.5, -74.25, 40.9, -73.7)
    }

    fn query_of(req: reqwest::RequestBuilder) -> (String, String) {
        let req = req.build().expect("valid request");
        let url = req.url();
        (url.path().to_string(), url.query().unwrap_or("").to_string())
    }

    #[test]
    fn empty_or_garbage_inputs_use_defaults() {
        assert_eq!(SeismicFilter::from_inputs("", ""), SeismicFilter::default());
        assert_eq!(
            SeismicFilter::from_inputs("abc", "  "),
            SeismicFilter {
                hours: 24.0,
                min_magnitude: 2.5
            }
        );
        assert_eq!(SeismicFilter::from_inputs("NaN", "inf"), SeismicFilter::default());
    }

    #[test]
    fn numeric_inputs_are_kept() {
        assert_eq!(
            SeismicFilter::from_inputs(" 72 ", "4.5"),
            SeismicFilter {
                hours: 72.0,
                min_magnitude: 4.5
            }
        );
        assert_eq!(SeismicFilter::from_inputs("48", "").min_magnitude, 2.5);
    }

    #[test]
    fn brand_request_carries_brand_and_bbox() {
        let c = HttpDataClient::new("http://localhost:8000/");
        assert_eq!(c.base_url(), "http://localhost:8000");
        let (path, query) = query_of(c.brand_request("starbucks", bbox()));
        assert_eq!(path, "/api/osm/brand");
        assert_eq!(
            query,
            "brand=starbucks&bbox=40.50000%2C-74.25000%2C40.90000%2C-73.70000"
        );
    }

    #[test]
    fn seismic_request_uses_coerced_thresholds() {
        let c = HttpDataClient::new("http://localhost:8000");
        let filter = SeismicFilter::from_inputs("", "oops");
        let (path, query) = query_of(c.seismic_request(filter, bbox()));
        assert_eq!(path, "/api/usgs/quakes");
        assert!(query.starts_with("hours=24&minmag=2.5&bbox="), "{query}");
    }

    fn local_client(base: String) -> HttpDataClient {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpDataClient::with_client(base, http)
    }

    /// Serves canned replies keyed on the request line until the test ends.
    async fn serve(routes: Vec<(&'static str, &'static str, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&buf);
                let request_line = head.lines().next().unwrap_or("").to_string();
                let (status, body) = routes
                    .iter()
                    .find(|(needle, _, _)| request_line.contains(needle))
                    .map(|(_, status, body)| (*status, *body))
                    .unwrap_or(("404 Not Found", ""));
                let reply = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn http_errors_and_bodies_map_to_query_results() {
        let base = serve(vec![
            ("brand=starbucks", "500 Internal Server Error", r#"{"error":"boom"}"#),
            ("brand=mcdonalds", "200 OK", "<html>busy</html>"),
            (
                "/api/usgs/quakes?hours=24&minmag=2.5",
                "200 OK",
                r#"{"type":"FeatureCollection","features":[]}"#,
            ),
        ])
        .await;
        let client = local_client(base);

        let failed = client.query_brand("starbucks", bbox()).await;
        assert_eq!(
            failed,
            Err(QueryError::QueryFailed {
                status: 500,
                status_text: "Internal Server Error".to_string()
            })
        );

        let malformed = client.query_brand("mcdonalds", bbox()).await;
        assert!(
            matches!(malformed, Err(QueryError::ParseFailed(_))),
            "{malformed:?}"
        );

        let empty = client
            .query_seismic("", "", bbox())
            .await
            .expect("empty collection is not an error");
        assert!(empty.features.is_empty());
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = local_client(format!("http://{addr}"));
        let result = client.query_brand("starbucks", bbox()).await;
        assert!(matches!(result, Err(QueryError::Transport(_))), "{result:?}");
    }
}
