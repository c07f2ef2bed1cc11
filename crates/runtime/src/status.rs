use std::collections::VecDeque;

/// Events kept by a [`StatusBoard`] before the oldest are dropped.
pub const STATUS_HISTORY_LIMIT: usize = 64;

/// One status line as shown to the user, tagged with the refresh that set it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub generation: u64,
    pub message: String,
}

/// The single human-readable status line plus its recent history.
///
/// Only [`StatusBoard::current`] is user facing; the history is kept for
/// diagnostics and holds at most `limit` events.
#[derive(Debug)]
pub struct StatusBoard {
    current: String,
    events: VecDeque<StatusEvent>,
    limit: usize,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::with_limit(STATUS_HISTORY_LIMIT)
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            current: String::new(),
            events: VecDeque::with_capacity(limit),
            limit,
        }
    }

    pub fn set(&mut self, generation: u64, message: impl Into<String>) {
        let message = message.into();
        self.current = message.clone();
        if self.limit == 0 {
            return;
        }
        while self.events.len() >= self.limit {
            self.events.pop_front();
        }
        self.events.push_back(StatusEvent {
            generation,
            message,
        });
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Oldest first.
    pub fn events(&self) -> impl ExactSizeIterator<Item = &StatusEvent> {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{STATUS_HISTORY_LIMIT, StatusBoard};

    #[test]
    fn latest_message_is_current() {
        let mut board = StatusBoard::new();
        assert_eq!(board.current(), "");
        board.set(1, "Loading Starbucks...");
        board.set(1, "Done.");
        assert_eq!(board.current(), "Done.");
        assert_eq!(board.events().len(), 2);
        assert_eq!(board.events().next().map(|e| e.generation), Some(1));
    }

    #[test]
    fn history_keeps_only_the_newest_events() {
        let mut board = StatusBoard::with_limit(3);
        for generation in 1..=10 {
            board.set(generation, format!("Done {generation}"));
        }
        let kept: Vec<u64> = board.events().map(|e| e.generation).collect();
        assert_eq!(kept, vec![8, 9, 10]);
        assert_eq!(board.current(), "Done 10");
    }

    #[test]
    fn zero_limit_still_tracks_current_line() {
        let mut board = StatusBoard::with_limit(0);
        board.set(1, "Done.");
        assert_eq!(board.events().len(), 0);
        assert_eq!(board.current(), "Done.");
        assert_eq!(StatusBoard::new().events().len(), 0);
        assert!(STATUS_HISTORY_LIMIT > 0);
    }
}
