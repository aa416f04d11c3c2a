//! Append-only, capped list of errors recorded on a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorEntry {
    /// Object the error belongs to; `None` for session-level errors.
    pub object_name: Option<String>,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Keeps the first `capacity` errors and counts the rest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorLog {
    entries: Vec<ErrorEntry>,
    dropped: u64,
    capacity: usize,
}

impl ErrorLog {
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self { entries: Vec::new(), dropped: 0, capacity }
    }

    pub fn push(&mut self, object_name: Option<&str>, message: &str) {
        if self.entries.len() >= self.capacity {
            self.dropped += 1;
            return;
        }
        self.entries.push(ErrorEntry {
            object_name: object_name.map(ToOwned::to_owned),
            message: message.to_owned(),
            at: Utc::now(),
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[ErrorEntry] {
        &self.entries
    }

    /// Total errors seen, including the ones past capacity.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.entries.len() as u64 + self.dropped
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.dropped == 0
    }

    /// First `limit` entries plus how many more exist beyond them.
    #[must_use]
    pub fn head(&self, limit: usize) -> (&[ErrorEntry], u64) {
        let shown = &self.entries[..self.entries.len().min(limit)];
        (shown, self.total() - shown.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_and_counts_overflow() {
        let mut log = ErrorLog::new(3);
        for i in 0..10 {
            log.push(Some("obj"), &format!("error {i}"));
        }
        assert_eq!(log.entries().len(), 3);
        assert_eq!(log.total(), 10);
        assert_eq!(log.entries()[0].message, "error 0");
    }

    #[test]
    fn head_reports_remaining() {
        let mut log = ErrorLog::new(100);
        for i in 0..5 {
            log.push(None, &format!("e{i}"));
        }
        let (shown, more) = log.head(2);
        assert_eq!(shown.len(), 2);
        assert_eq!(more, 3);
        let (shown, more) = log.head(50);
        assert_eq!(shown.len(), 5);
        assert_eq!(more, 0);
    }
}
