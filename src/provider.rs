use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::{ExportPreset, ImageRequestOptions, VideoRequestOptions};
use crate::errors::ProviderFailure;
use crate::types::{
    AssetRef, ContainerFormat, ContentMode, ExportStatus, ImageArtifact, RequestToken, TargetSize,
};

/// Invoked by a provider zero or more times while a request is served
/// remotely. A non-`None` error means the fetch is over.
pub type ProgressHandler = Arc<dyn Fn(f32, Option<ProviderFailure>) + Send + Sync>;

/// Result callback for image requests. May fire more than once: an
/// opportunistic degraded artifact first, the final one later.
pub type ImageResultHandler = Arc<dyn Fn(Option<ImageArtifact>, Option<ProviderFailure>) + Send + Sync>;

/// Result callback for data requests. Fires exactly once.
pub type DataResultHandler = Box<dyn FnOnce(Option<Bytes>, Option<ProviderFailure>) + Send>;

/// Result callback for export handle acquisition. Fires exactly once.
pub type ExportHandleResultHandler =
    Box<dyn FnOnce(Option<Arc<dyn ExportHandle>>, Option<ProviderFailure>) + Send>;

/// Native image/data retrieval API. Requests are asynchronous; the returned
/// token is only useful for `cancel`.
pub trait MediaProvider: Send + Sync {
    fn request_image(
        &self,
        asset: &AssetRef,
        target_size: TargetSize,
        content_mode: ContentMode,
        options: ImageRequestOptions,
        result: ImageResultHandler,
    ) -> RequestToken;

    fn request_data(
        &self,
        asset: &AssetRef,
        options: ImageRequestOptions,
        result: DataResultHandler,
    ) -> RequestToken;

    fn cancel(&self, token: RequestToken);
}

/// Native export API: acquires an [`ExportHandle`] for an asset.
pub trait ExportProvider: Send + Sync {
    fn request_export_handle(
        &self,
        asset: &AssetRef,
        options: VideoRequestOptions,
        preset: ExportPreset,
        result: ExportHandleResultHandler,
    ) -> RequestToken;

    fn cancel(&self, token: RequestToken);
}

/// An in-progress encode/transcode operation owned by the provider.
///
/// `status`, `progress` and `error` are mutated exclusively by the provider;
/// the bridge and poller only read them.
#[async_trait]
pub trait ExportHandle: Send + Sync {
    fn status(&self) -> ExportStatus;

    fn progress(&self) -> f32;

    fn error(&self) -> Option<ProviderFailure>;

    fn output_path(&self) -> Option<PathBuf>;

    fn set_output_path(&self, path: PathBuf);

    /// Container formats this handle can write for the current asset/preset.
    async fn compatible_formats(&self) -> Vec<ContainerFormat>;

    /// Starts the asynchronous export. Progress is observed by polling.
    fn begin_export(&self);

    fn cancel_export(&self);
}
