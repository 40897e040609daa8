use std::sync::Arc;

use kv_store::KvStore;
use tracing::warn;

use crate::model::Event;

/// Thin persistence adapter over the shared key-value store: the whole event
/// log lives as one JSON array under one namespaced key. Reads never fail;
/// anything unparsable is treated as an empty log. Writes are best-effort,
/// and the in-memory log stays authoritative when the backend rejects them.
pub struct EventJournal {
    store: Arc<dyn KvStore>,
    key: String,
}

impl EventJournal {
    pub fn new(store: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn read(&self) -> Vec<Event> {
        let raw = match self.store.get(&self.key) {
            Some(raw) => raw,
            None => return Vec::new(),
        };
        match serde_json::from_str::<Vec<Event>>(&raw) {
            Ok(events) => events,
            Err(err) => {
                warn!(key = %self.key, %err, "persisted telemetry unreadable; starting empty");
                Vec::new()
            }
        }
    }

    pub fn write(&self, events: &[Event]) {
        let raw = match serde_json::to_string(events) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key = %self.key, %err, "telemetry serialization failed; write skipped");
                return;
            }
        };
        if let Err(err) = self.store.set(&self.key, &raw) {
            warn!(key = %self.key, %err, "telemetry persistence failed; log kept in memory");
        }
    }
}
