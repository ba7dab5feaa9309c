//! Event and stored record types shared by the ingestion and reporting sides

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single analytics occurrence admitted by the validator.
///
/// `site_id` and `event_type` are always non-empty once an `Event` has been
/// produced by validation. Optional context fields are empty strings when the
/// client did not send them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub site_id: String,
    pub event_type: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub timestamp: String,
}

impl Event {
    /// Create an event with only the required fields set
    pub fn new(site_id: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            event_type: event_type.into(),
            path: String::new(),
            user_id: String::new(),
            timestamp: String::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Fill in the timestamp if the client did not provide one.
    ///
    /// Client-supplied timestamps are kept verbatim.
    pub fn stamped_at(mut self, now: DateTime<Utc>) -> Self {
        if self.timestamp.is_empty() {
            self.timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        }
        self
    }
}

/// An event as persisted by the store, with its storage-assigned identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEventRecord {
    pub id: i64,
    pub site_id: String,
    pub event_type: String,
    pub path: String,
    pub user_id: String,
    pub timestamp: String,
}

impl StoredEventRecord {
    pub fn from_event(id: i64, event: Event) -> Self {
        Self {
            id,
            site_id: event.site_id,
            event_type: event.event_type,
            path: event.path,
            user_id: event.user_id,
            timestamp: event.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stamp_fills_missing_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();
        let event = Event::new("s1", "click").stamped_at(now);
        assert_eq!(event.timestamp, "2026-03-01T12:30:00.000Z");
    }

    #[test]
    fn test_stamp_keeps_client_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();
        let event = Event::new("s1", "click").with_timestamp("yesterday").stamped_at(now);
        assert_eq!(event.timestamp, "yesterday");
    }

    #[test]
    fn test_record_serializes_with_all_columns() {
        let record = StoredEventRecord::from_event(7, Event::new("s1", "view").with_path("/home"));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["site_id"], "s1");
        assert_eq!(json["event_type"], "view");
        assert_eq!(json["path"], "/home");
        assert_eq!(json["user_id"], "");
        assert_eq!(json["timestamp"], "");
    }
}
