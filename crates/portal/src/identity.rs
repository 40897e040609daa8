use std::sync::Arc;

use chrono::{DateTime, Utc};
use kv_store::KvStore;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uxlab_core_types::ParticipantId;

use crate::db::{DB_KEY, LAST_SUBMISSION_KEY};

pub const IDENTITY_KEY: &str = "study_identity_v1";

/// Anonymous participant identity generated per browser. The nickname is
/// optional free text and must not be a real name; it is never used to key
/// any lookup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Identity {
    pub study_id: ParticipantId,
    #[serde(default)]
    pub nickname: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct IdentityStore {
    store: Arc<dyn KvStore>,
}

impl IdentityStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn get(&self) -> Option<Identity> {
        let raw = self.store.get(IDENTITY_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(identity) => Some(identity),
            Err(err) => {
                warn!(%err, "stored identity unreadable; treating as absent");
                None
            }
        }
    }

    /// Returns the stored identity, minting and persisting a fresh one on
    /// first use.
    pub fn ensure(&self) -> Identity {
        if let Some(identity) = self.get() {
            return identity;
        }
        let identity = Identity {
            study_id: ParticipantId::generate(),
            nickname: String::new(),
            created_at: Utc::now(),
        };
        self.save(&identity);
        identity
    }

    pub fn set_nickname(&self, nickname: &str) -> Identity {
        let mut identity = self.ensure();
        identity.nickname = nickname.trim().to_string();
        self.save(&identity);
        identity
    }

    /// Clears the identity together with the participant's study data; the
    /// next `ensure` mints a new study id.
    pub fn reset(&self) {
        self.store.remove(IDENTITY_KEY);
        self.store.remove(DB_KEY);
        self.store.remove(LAST_SUBMISSION_KEY);
    }

    fn save(&self, identity: &Identity) {
        match serde_json::to_string(identity) {
            Ok(raw) => {
                if let Err(err) = self.store.set(IDENTITY_KEY, &raw) {
                    warn!(%err, "identity persistence failed");
                }
            }
            Err(err) => warn!(%err, "identity serialization failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use kv_store::MemoryStore;

    #[test]
    fn ensure_is_stable_across_calls() {
        let ids = IdentityStore::new(MemoryStore::new());
        let first = ids.ensure();
        let second = ids.ensure();
        assert_eq!(first.study_id, second.study_id);
    }

    #[test]
    fn nickname_is_trimmed_and_persisted() {
        let ids = IdentityStore::new(MemoryStore::new());
        ids.ensure();
        let updated = ids.set_nickname("  Sparrow  ");
        assert_eq!(updated.nickname, "Sparrow");
        assert_eq!(ids.get().unwrap().nickname, "Sparrow");
    }

    #[test]
    fn reset_mints_a_new_study_id() {
        let ids = IdentityStore::new(MemoryStore::new());
        let before = ids.ensure();
        ids.reset();
        let after = ids.ensure();
        assert_ne!(before.study_id, after.study_id);
    }

    #[test]
    fn corrupt_identity_reads_as_absent() {
        let store = MemoryStore::new();
        store.set(IDENTITY_KEY, "][").unwrap();
        let ids = IdentityStore::new(store);
        assert!(ids.get().is_none());
    }
}
