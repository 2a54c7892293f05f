use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::BridgeError;

/// Tri-state payload carried by every stream the bridge produces.
///
/// `Processing` may repeat any number of times. `Failure` always ends the
/// stream. `Success` ends the stream for data fetches and exports, but an
/// image fetch may deliver a degraded artifact first and the final one later,
/// so only a non-degraded `Success` is terminal there.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaResult<T> {
    Processing(f32),
    Success(T),
    Failure(BridgeError),
}

impl<T> MediaResult<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            MediaResult::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&BridgeError> {
        match self {
            MediaResult::Failure(error) => Some(error),
            _ => None,
        }
    }

    /// Progress of an in-flight operation; 0 when not `Processing`.
    pub fn progress(&self) -> f32 {
        match self {
            MediaResult::Processing(progress) => *progress,
            _ => 0.0,
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, MediaResult::Processing(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MediaResult::Success(_))
    }
}

/// Identifies an asset in the provider's library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    pub local_id: String,
}

impl AssetRef {
    pub fn new(local_id: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
        }
    }
}

/// Requested pixel dimensions for an image fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// How the provider should fit the image into the target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentMode {
    #[default]
    Default,
    AspectFit,
    AspectFill,
}

/// Decoded image payload returned by a provider.
///
/// `degraded` marks an opportunistic low-fidelity pass; the provider will
/// call back again with the final artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageArtifact {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub degraded: bool,
}

impl ImageArtifact {
    pub fn new(data: Bytes, width: u32, height: u32, degraded: bool) -> Self {
        Self {
            data,
            width,
            height,
            degraded,
        }
    }
}

/// Container formats an export handle can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerFormat {
    Mov,
    Mp4,
    M4v,
}

/// Status of an in-progress export, mutated only by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportStatus {
    Unknown,
    Waiting,
    Exporting,
    Completed,
    Failed,
    Cancelled,
}

impl ExportStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExportStatus::Completed | ExportStatus::Failed | ExportStatus::Cancelled
        )
    }
}

/// Opaque token for an in-flight provider request. Held only so it can be
/// handed back to the provider's cancel primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(Uuid);

impl RequestToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestToken {
    fn default() -> Self {
        Self::new()
    }
}
