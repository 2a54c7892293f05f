use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::provider::ProgressHandler;
use crate::types::ContainerFormat;

/// Quality/latency trade-off requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeliveryMode {
    Opportunistic,
    #[default]
    HighQuality,
    Fast,
}

/// Which edit revision of the asset to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AssetVersion {
    #[default]
    Current,
    Unadjusted,
    Original,
}

/// Encode preset handed to the export provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportPreset {
    LowQuality,
    MediumQuality,
    #[default]
    HighestQuality,
    Passthrough,
}

/// Options for image and data fetch requests.
///
/// `progress_handler` is a mutable callback slot the provider invokes zero or
/// more times while the asset is fetched remotely; the bridge fills it in
/// before issuing the request.
#[derive(Clone)]
pub struct ImageRequestOptions {
    pub network_access_allowed: bool,
    pub delivery_mode: DeliveryMode,
    pub version: AssetVersion,
    pub progress_handler: Option<ProgressHandler>,
}

impl Default for ImageRequestOptions {
    fn default() -> Self {
        Self {
            network_access_allowed: true,
            delivery_mode: DeliveryMode::HighQuality,
            version: AssetVersion::Current,
            progress_handler: None,
        }
    }
}

/// Options for video export requests. The progress slot reports the network
/// fetch that precedes encoding, not the export itself.
#[derive(Clone)]
pub struct VideoRequestOptions {
    pub network_access_allowed: bool,
    pub delivery_mode: DeliveryMode,
    pub version: AssetVersion,
    pub progress_handler: Option<ProgressHandler>,
}

impl Default for VideoRequestOptions {
    fn default() -> Self {
        Self {
            network_access_allowed: true,
            delivery_mode: DeliveryMode::HighQuality,
            version: AssetVersion::Current,
            progress_handler: None,
        }
    }
}

/// Settings for the export bridge and its progress poller.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// How often the poller samples the export handle.
    pub poll_interval: Duration,
    /// Container format the export destination must support.
    pub required_format: ContainerFormat,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            required_format: ContainerFormat::Mov,
        }
    }
}
