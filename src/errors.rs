use thiserror::Error;

use crate::types::{ContainerFormat, ExportStatus};

/// Error supplied by the native provider layer, passed through unmodified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("provider error {code}: {message}")]
pub struct ProviderFailure {
    pub code: i32,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Terminal errors surfaced as `MediaResult::Failure` events.
///
/// `UnsupportedFormat` and `ExportFailed` are distinct so callers can tell
/// an export that never started from one that started and failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("fetch request produced no artifact")]
    FetchFailed,

    #[error("destination container format not supported: {format:?}")]
    UnsupportedFormat { format: ContainerFormat },

    #[error("export ended in {status:?} state")]
    ExportFailed { status: ExportStatus },

    #[error(transparent)]
    Provider(#[from] ProviderFailure),
}
