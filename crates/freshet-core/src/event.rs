//! The basic unit of data in Freshet. All steps receive and emit events.

use crate::types::Value;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;

/// Key used by steps that aggregate events by key.
///
/// A key is either a single string or an ordered list of strings
/// (composite key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKey {
    Single(String),
    Composite(Vec<String>),
}

impl From<&str> for EventKey {
    fn from(key: &str) -> Self {
        EventKey::Single(key.to_string())
    }
}

impl From<String> for EventKey {
    fn from(key: String) -> Self {
        EventKey::Single(key)
    }
}

impl From<Vec<String>> for EventKey {
    fn from(parts: Vec<String>) -> Self {
        EventKey::Composite(parts)
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKey::Single(key) => write!(f, "{key}"),
            EventKey::Composite(parts) => write!(f, "{}", parts.join(".")),
        }
    }
}

/// One stream record.
///
/// Events are owned by the producer and passed by reference to each step;
/// no step retains an event beyond its own processing call. `time` is
/// always a concrete timestamp after construction, defaulting to the
/// creation instant in UTC.
#[derive(Debug, Clone)]
pub struct Event {
    /// The event payload
    pub body: Value,
    /// Aggregation key (optional; never part of event equality)
    pub key: Option<EventKey>,
    /// Event time, UTC
    pub time: DateTime<Utc>,
    /// Event identifier
    pub id: Option<String>,
    /// Request headers (HTTP only)
    pub headers: Option<HashMap<String, String>>,
    /// Request method (HTTP only)
    pub method: Option<String>,
    /// Request path (HTTP only)
    pub path: String,
    /// Request content type (HTTP only)
    pub content_type: Option<String>,
    /// Error raised while processing this event, if any
    pub error: Option<String>,
}

impl Event {
    /// Create an event with the given body, timestamped now.
    pub fn new(body: Value) -> Self {
        Self {
            body,
            key: None,
            time: Utc::now(),
            id: None,
            headers: None,
            method: None,
            path: "/".to_string(),
            content_type: None,
            error: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<EventKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    /// Set the event time from epoch seconds, interpreted as UTC.
    ///
    /// Seconds outside chrono's representable range leave the creation
    /// time in place.
    pub fn with_epoch_seconds(mut self, seconds: i64) -> Self {
        if let Some(time) = DateTime::from_timestamp(seconds, 0) {
            self.time = time;
        }
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Event time in epoch milliseconds.
    pub fn time_millis(&self) -> i64 {
        self.time.timestamp_millis()
    }
}

// Equality compares payload and metadata, never the aggregation key or
// the error slot.
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.body == other.body
            && self.time == other.time
            && self.id == other.id
            && self.headers == other.headers
            && self.method == other.method
            && self.path == other.path
            && self.content_type == other.content_type
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = self
            .key
            .as_ref()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "None".to_string());
        write!(
            f,
            "Event(id={:?}, key={}, time={}, body={:?})",
            self.id, key, self.time, self.body
        )
    }
}
