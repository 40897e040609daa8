use std::path::PathBuf;

/// When appended events reach durable storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistPolicy {
    /// Write the whole log on every append. Durability-favoring; nothing is
    /// ever pending when the page goes away.
    Immediate,
    /// Coalesce appends onto a timer; a later append supersedes the pending
    /// write. Teardown cancels the timer and flushes synchronously.
    Debounced { delay_ms: u64 },
}

/// Knobs for one recorder instance.
#[derive(Clone, Debug)]
pub struct RecorderCfg {
    /// Storage key holding the persisted event array.
    pub storage_key: String,
    pub persist: PersistPolicy,
    /// Directory CSV reports are written into.
    pub export_dir: PathBuf,
    /// Upper bound on how long deferred init may wait for an idle point.
    pub idle_timeout_ms: u64,
}

impl Default for RecorderCfg {
    fn default() -> Self {
        Self {
            storage_key: "metrics_logs_v1".into(),
            persist: PersistPolicy::Immediate,
            export_dir: PathBuf::from("."),
            idle_timeout_ms: 2_000,
        }
    }
}
