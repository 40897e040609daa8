use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage quota exceeded writing key {0}")]
    QuotaExceeded(String),
    #[error("storage backend unavailable: {0}")]
    Backend(String),
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
}
