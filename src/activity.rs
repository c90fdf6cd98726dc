//! Bounded, append-only log of human-readable activity entries.

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use crate::entity::Activity;

/// Activity entries in append order, capped at `limit`.
///
/// Overflow drops the oldest entries. Entries are never edited once
/// appended, and removing an entity leaves its entries in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityLog {
    entries: Vec<Activity>,
    limit: usize,
}

impl ActivityLog {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit,
        }
    }

    /// Build a log from stored entries (oldest first), trimming to `limit`.
    /// Entries without an id get one derived from their content, so the
    /// same stored data always yields the same ids.
    pub fn from_entries(mut entries: Vec<Activity>, limit: usize) -> Self {
        let mut occurrences: HashMap<(String, String, String), usize> = HashMap::new();
        for entry in entries.iter_mut().filter(|e| e.id.is_nil()) {
            let key = (
                entry.date.as_str().to_string(),
                entry.kind.clone(),
                entry.action.clone(),
            );
            let ordinal = occurrences.entry(key).or_insert(0);
            entry.id = entry.legacy_id(*ordinal);
            *ordinal += 1;
        }

        let mut log = Self { entries, limit };
        log.trim();
        log
    }

    pub fn append(&mut self, entry: Activity) {
        self.entries.push(entry);
        self.trim();
    }

    /// The `n` most recent entries, most recent first.
    pub fn recent(&self, n: usize) -> Vec<&Activity> {
        self.entries.iter().rev().take(n).collect()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[Activity] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn trim(&mut self) {
        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess);
        }
    }
}

impl Serialize for ActivityLog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::RecordDate;

    fn entry(n: usize) -> Activity {
        Activity::new(
            RecordDate::parse("2024-05-01").unwrap(),
            format!("event {}", n),
            "farm",
        )
    }

    #[test]
    fn test_recent_is_most_recent_first() {
        let mut log = ActivityLog::new(50);
        for i in 0..5 {
            log.append(entry(i));
        }
        let recent: Vec<&str> = log.recent(3).iter().map(|a| a.action.as_str()).collect();
        assert_eq!(recent, vec!["event 4", "event 3", "event 2"]);
    }

    #[test]
    fn test_recent_more_than_available() {
        let mut log = ActivityLog::new(50);
        log.append(entry(0));
        assert_eq!(log.recent(10).len(), 1);
        assert!(ActivityLog::new(50).recent(10).is_empty());
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mut log = ActivityLog::new(50);
        for i in 0..60 {
            log.append(entry(i));
        }
        assert_eq!(log.len(), 50);
        assert_eq!(log.entries()[0].action, "event 10");
        assert_eq!(log.recent(1)[0].action, "event 59");
    }

    #[test]
    fn test_from_entries_trims_oversized_input() {
        let entries: Vec<Activity> = (0..8).map(entry).collect();
        let log = ActivityLog::from_entries(entries, 5);
        assert_eq!(log.len(), 5);
        assert_eq!(log.entries()[0].action, "event 3");
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let mut log = ActivityLog::new(2);
        log.append(entry(1));
        let value = serde_json::to_value(&log).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["action"], "event 1");
        assert_eq!(value[0]["type"], "farm");
    }

    #[test]
    fn test_entries_without_id_get_stable_ids() {
        let raw = r#"[
            {"date":"2024-05-01","action":"Added farm A","type":"farm"},
            {"date":"2024-05-01","action":"Added farm A","type":"farm"},
            {"date":"2024-05-02","message":"Planted Maize at A","type":"crop"}
        ]"#;
        let first = ActivityLog::from_entries(serde_json::from_str(raw).unwrap(), 50);
        let second = ActivityLog::from_entries(serde_json::from_str(raw).unwrap(), 50);

        let ids: Vec<_> = first.entries().iter().map(|a| a.id).collect();
        assert!(ids.iter().all(|id| !id.is_nil()));
        assert_ne!(ids[0], ids[1]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_stored_ids_are_kept() {
        let kept = entry(1);
        let log = ActivityLog::from_entries(vec![kept.clone()], 50);
        assert_eq!(log.entries()[0].id, kept.id);
    }
}
