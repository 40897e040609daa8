use thiserror::Error;

use uxlab_core_types::StudyError;

#[derive(Clone, Debug, Error)]
pub enum TelemetryErrorKind {
    #[error("csv write failed: {0}")]
    CsvWriteFailed(String),
    #[error("export directory unavailable: {0}")]
    ExportUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, Error)]
#[error(transparent)]
pub struct TelemetryError(pub TelemetryErrorKind);

impl TelemetryError {
    pub fn kind(&self) -> &TelemetryErrorKind {
        &self.0
    }
}

impl From<TelemetryErrorKind> for TelemetryError {
    fn from(kind: TelemetryErrorKind) -> Self {
        TelemetryError(kind)
    }
}

impl From<TelemetryError> for StudyError {
    fn from(value: TelemetryError) -> Self {
        StudyError::new(value.to_string())
    }
}
