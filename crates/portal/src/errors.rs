use kv_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("unknown assignment: {0}")]
    UnknownAssignment(String),
    #[error("unknown submission: {0}")]
    UnknownSubmission(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
