use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::StoreError;
use crate::listeners::ListenerSet;
use crate::{KvListener, KvStore};

/// Heap-backed store used by tests and short-lived simulations. An optional
/// quota bounds the total size of keys plus values, mirroring the browser
/// storage limit.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    listeners: ListenerSet,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: None,
            listeners: ListenerSet::default(),
        })
    }

    pub fn with_quota(quota_bytes: usize) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
            listeners: ListenerSet::default(),
        })
    }

    fn used_bytes(entries: &HashMap<String, String>) -> usize {
        entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        {
            let mut entries = self.entries.lock();
            if let Some(quota) = self.quota_bytes {
                let current = entries.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
                let projected = Self::used_bytes(&entries) - current + key.len() + value.len();
                if projected > quota {
                    return Err(StoreError::QuotaExceeded(key.to_string()));
                }
            }
            entries.insert(key.to_string(), value.to_string());
        }
        self.listeners.emit(key);
        Ok(())
    }

    fn remove(&self, key: &str) {
        let removed = self.entries.lock().remove(key).is_some();
        if removed {
            self.listeners.emit(key);
        }
    }

    fn subscribe(&self, listener: KvListener) {
        self.listeners.register(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn round_trips_values() {
        let store = MemoryStore::new();
        assert!(store.get("k").is_none());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v"));
        store.remove("k");
        assert!(store.get("k").is_none());
    }

    #[test]
    fn quota_rejects_oversized_writes() {
        let store = MemoryStore::with_quota(8);
        store.set("a", "1234").unwrap();
        let err = store.set("b", "123456789").unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded(_)));
        // The failed write must not clobber existing state.
        assert_eq!(store.get("a").as_deref(), Some("1234"));
        assert!(store.get("b").is_none());
    }

    #[test]
    fn overwrites_free_their_old_bytes_under_quota() {
        let store = MemoryStore::with_quota(10);
        store.set("k", "123456789").unwrap();
        store.set("k", "987654321").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("987654321"));
    }

    #[test]
    fn listeners_observe_mutations() {
        let store = MemoryStore::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        store.subscribe(Arc::new(move |key| {
            assert_eq!(key, "watched");
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        store.set("watched", "1").unwrap();
        store.remove("watched");
        // Removing an absent key stays silent.
        store.remove("watched");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
