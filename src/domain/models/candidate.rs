//! Candidate records observed on a remote system during one tick.

use serde::{Deserialize, Serialize};

/// One remote record considered for emission in a given tick.
///
/// `key` must be stable across ticks for the same record. `timestamp_ms` is
/// the record's creation or update time in epoch milliseconds; the
/// time-based strategy requires it and the last-item strategy ignores it.
/// `payload` is handed to the consumer untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<i64>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Candidate {
    /// Create a candidate without a timestamp.
    pub fn new(key: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            timestamp_ms: None,
            payload,
        }
    }

    /// Create a candidate stamped with `timestamp_ms`.
    pub fn timestamped(key: impl Into<String>, timestamp_ms: i64, payload: serde_json::Value) -> Self {
        Self::new(key, payload).with_timestamp_ms(timestamp_ms)
    }

    /// Set the timestamp.
    pub fn with_timestamp_ms(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }
}
