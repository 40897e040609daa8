pub mod errors;
pub mod file;
pub mod memory;

mod listeners;

use std::sync::Arc;

pub use errors::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;

/// Callback invoked with the mutated key after every `set`/`remove` on the
/// store, regardless of which handle performed the write. Pages sharing one
/// store stand in for same-origin tabs sharing browser storage.
pub type KvListener = Arc<dyn Fn(&str) + Send + Sync>;

/// String-keyed value storage in the shape of browser local storage: flat
/// namespace, whole-value overwrites, last writer wins.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str);
    fn subscribe(&self, listener: KvListener);
}
