use std::sync::Arc;

use chrono::{DateTime, Utc};
use kv_store::KvStore;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const JOURNAL_KEY: &str = "eventlog";

/// One business event: logins, submissions, feedback, mirrored telemetry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JournalRecord {
    pub event: String,
    pub ts: DateTime<Utc>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Append-only business journal under its own storage key, separate from the
/// interaction telemetry log.
#[derive(Clone)]
pub struct StudyJournal {
    store: Arc<dyn KvStore>,
}

impl StudyJournal {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn log(&self, event: &str, payload: serde_json::Value) {
        let mut entries = self.entries();
        entries.push(JournalRecord {
            event: event.to_string(),
            ts: Utc::now(),
            payload,
        });
        match serde_json::to_string(&entries) {
            Ok(raw) => {
                if let Err(err) = self.store.set(JOURNAL_KEY, &raw) {
                    warn!(event, %err, "journal persistence failed");
                }
            }
            Err(err) => warn!(event, %err, "journal serialization failed"),
        }
    }

    pub fn entries(&self) -> Vec<JournalRecord> {
        let raw = match self.store.get(JOURNAL_KEY) {
            Some(raw) => raw,
            None => return Vec::new(),
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(%err, "journal unreadable; starting empty");
                Vec::new()
            }
        }
    }

    pub fn clear(&self) {
        self.store.remove(JOURNAL_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use kv_store::MemoryStore;
    use serde_json::json;

    #[test]
    fn appends_in_order() {
        let journal = StudyJournal::new(MemoryStore::new());
        journal.log("login_succeeded", json!({"study_id": "P0001"}));
        journal.log("submission_succeeded", json!({"version": 1}));
        let entries = journal.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event, "login_succeeded");
        assert_eq!(entries[1].payload["version"], json!(1));
    }

    #[test]
    fn clear_empties_the_log() {
        let journal = StudyJournal::new(MemoryStore::new());
        journal.log("x", json!({}));
        journal.clear();
        assert!(journal.entries().is_empty());
    }

    #[test]
    fn corrupt_journal_reads_as_empty() {
        let store = MemoryStore::new();
        store.set(JOURNAL_KEY, "<binary>").unwrap();
        let journal = StudyJournal::new(store);
        assert!(journal.entries().is_empty());
    }
}
