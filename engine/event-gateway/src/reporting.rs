//! Dashboard aggregates computed from stored records.
//!
//! Historical rows may have empty or malformed fields; they are counted, never
//! rejected.

use chrono::{DateTime, Utc};
use event_store::StoredEventRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bucket for timestamps that are not RFC 3339
pub const UNKNOWN_BUCKET: &str = "Unknown";

/// Key used when a grouped field is empty
pub const EMPTY_KEY: &str = "(none)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub bucket: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSummary {
    pub total: u64,
    pub last_id: Option<i64>,
    pub by_event_type: BTreeMap<String, u64>,
    pub by_site: BTreeMap<String, u64>,
    pub by_path: BTreeMap<String, u64>,
    /// Per-minute counts, oldest first, with the unknown bucket last
    pub timeline: Vec<TimelinePoint>,
}

fn group_key(value: &str) -> String {
    if value.is_empty() {
        EMPTY_KEY.to_string()
    } else {
        value.to_string()
    }
}

/// Minute bucket such as `2026-05-01T10:04:00Z`, or `None` if unparseable
fn minute_bucket(timestamp: &str) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(timestamp).ok()?;
    Some(parsed.with_timezone(&Utc).format("%Y-%m-%dT%H:%M:00Z").to_string())
}

pub fn summarize(records: &[StoredEventRecord]) -> EventSummary {
    let mut by_event_type = BTreeMap::new();
    let mut by_site = BTreeMap::new();
    let mut by_path = BTreeMap::new();
    let mut minutes: BTreeMap<String, u64> = BTreeMap::new();
    let mut unknown = 0u64;

    for record in records {
        *by_event_type.entry(group_key(&record.event_type)).or_insert(0) += 1;
        *by_site.entry(group_key(&record.site_id)).or_insert(0) += 1;
        *by_path.entry(group_key(&record.path)).or_insert(0) += 1;

        match minute_bucket(&record.timestamp) {
            Some(bucket) => *minutes.entry(bucket).or_insert(0) += 1,
            None => unknown += 1,
        }
    }

    let mut timeline: Vec<TimelinePoint> =
        minutes.into_iter().map(|(bucket, count)| TimelinePoint { bucket, count }).collect();
    if unknown > 0 {
        timeline.push(TimelinePoint { bucket: UNKNOWN_BUCKET.to_string(), count: unknown });
    }

    EventSummary {
        total: records.len() as u64,
        last_id: records.iter().map(|r| r.id).max(),
        by_event_type,
        by_site,
        by_path,
        timeline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, site: &str, kind: &str, path: &str, ts: &str) -> StoredEventRecord {
        StoredEventRecord {
            id,
            site_id: site.to_string(),
            event_type: kind.to_string(),
            path: path.to_string(),
            user_id: String::new(),
            timestamp: ts.to_string(),
        }
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.last_id, None);
        assert!(summary.timeline.is_empty());
    }

    #[test]
    fn test_counts_by_dimension() {
        let records = vec![
            record(1, "s1", "click", "/a", "2026-05-01T10:04:12Z"),
            record(2, "s1", "view", "/a", "2026-05-01T10:04:59.500Z"),
            record(3, "s2", "click", "", "2026-05-01T10:05:00Z"),
        ];

        let summary = summarize(&records);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.last_id, Some(3));
        assert_eq!(summary.by_event_type["click"], 2);
        assert_eq!(summary.by_site["s1"], 2);
        assert_eq!(summary.by_path["/a"], 2);
        assert_eq!(summary.by_path[EMPTY_KEY], 1);
        assert_eq!(
            summary.timeline,
            vec![
                TimelinePoint { bucket: "2026-05-01T10:04:00Z".to_string(), count: 2 },
                TimelinePoint { bucket: "2026-05-01T10:05:00Z".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_offsets_normalized_to_utc() {
        let records = vec![record(1, "s1", "click", "/", "2026-05-01T12:04:30+02:00")];
        let summary = summarize(&records);
        assert_eq!(summary.timeline[0].bucket, "2026-05-01T10:04:00Z");
    }

    #[test]
    fn test_bad_timestamps_land_in_unknown_bucket() {
        let records = vec![
            record(1, "s1", "click", "/", ""),
            record(2, "s1", "click", "/", "yesterday"),
            record(3, "s1", "click", "/", "2026-05-01T10:04:00Z"),
        ];

        let summary = summarize(&records);
        assert_eq!(summary.timeline.len(), 2);
        assert_eq!(summary.timeline[1], TimelinePoint { bucket: UNKNOWN_BUCKET.to_string(), count: 2 });
    }
}
