use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::errors::StoreError;
use crate::listeners::ListenerSet;
use crate::{KvListener, KvStore};

/// Directory-backed store keeping one `<key>.json` file per key so the
/// persisted state stays human-inspectable. Writes go through a temp file
/// and rename so a crash never leaves a half-written value behind.
pub struct FileStore {
    root: PathBuf,
    listeners: ListenerSet,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Arc<Self>, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Arc::new(Self {
            root,
            listeners: ListenerSet::default(),
        }))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are flat identifiers; anything path-like is flattened so a key
        // can never escape the store root.
        let safe: String = key
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.root.join(format!("{safe}.json"))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Some(raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(key, %err, "kv read failed; treating key as absent");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        self.listeners.emit(key);
        Ok(())
    }

    fn remove(&self, key: &str) {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => self.listeners.emit(key),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(key, %err, "kv remove failed"),
        }
    }

    fn subscribe(&self, listener: KvListener) {
        self.listeners.register(listener);
    }
}
