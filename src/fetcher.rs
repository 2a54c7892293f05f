use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::config::ImageRequestOptions;
use crate::errors::BridgeError;
use crate::provider::{DataResultHandler, ImageResultHandler, MediaProvider};
use crate::stream::{progress_to_sink, CancelGuard, EventSink, ResultStream};
use crate::types::{AssetRef, ContentMode, ImageArtifact, MediaResult, TargetSize};

/// Wraps a provider's one-shot and multi-shot fetch callbacks into
/// cancellable event streams. Dropping a returned stream before it completes
/// cancels the underlying native request.
pub struct MediaFetcher {
    provider: Arc<dyn MediaProvider>,
}

impl MediaFetcher {
    pub fn new(provider: Arc<dyn MediaProvider>) -> Self {
        Self { provider }
    }

    /// Requests the backing image for an asset.
    ///
    /// The provider may invoke the result callback more than once: an
    /// opportunistic degraded artifact first, the final high-quality one
    /// later. The stream stays open after a degraded `Success` and completes
    /// only after the final artifact.
    pub fn request_image(
        &self,
        asset: &AssetRef,
        target_size: TargetSize,
        content_mode: ContentMode,
        mut options: ImageRequestOptions,
    ) -> ResultStream<ImageArtifact> {
        let (sink, rx) = EventSink::channel();
        options.progress_handler = Some(progress_to_sink(sink.clone()));

        let result_sink = sink.clone();
        let result: ImageResultHandler = Arc::new(move |artifact, error| match artifact {
            None => {
                let error = error
                    .map(BridgeError::Provider)
                    .unwrap_or(BridgeError::FetchFailed);
                result_sink.emit(MediaResult::Failure(error));
                result_sink.complete();
            }
            Some(artifact) => {
                let degraded = artifact.degraded;
                result_sink.emit(MediaResult::Success(artifact));
                if !degraded {
                    result_sink.complete();
                }
            }
        });

        let token = self
            .provider
            .request_image(asset, target_size, content_mode, options, result);
        debug!(asset = %asset.local_id, ?token, "image request issued");

        let provider = Arc::clone(&self.provider);
        let guard = CancelGuard::new(
            sink.open_flag(),
            Box::new(move || provider.cancel(token)),
        );
        ResultStream::new(rx, guard)
    }

    /// Requests the backing data blob for an asset. The first `Success`
    /// always completes the stream.
    pub fn request_data(
        &self,
        asset: &AssetRef,
        mut options: ImageRequestOptions,
    ) -> ResultStream<Bytes> {
        let (sink, rx) = EventSink::channel();
        options.progress_handler = Some(progress_to_sink(sink.clone()));

        let result_sink = sink.clone();
        let result: DataResultHandler = Box::new(move |data, error| {
            match data {
                None => {
                    let error = error
                        .map(BridgeError::Provider)
                        .unwrap_or(BridgeError::FetchFailed);
                    result_sink.emit(MediaResult::Failure(error));
                }
                Some(data) => result_sink.emit(MediaResult::Success(data)),
            }
            result_sink.complete();
        });

        let token = self.provider.request_data(asset, options, result);
        debug!(asset = %asset.local_id, ?token, "data request issued");

        let provider = Arc::clone(&self.provider);
        let guard = CancelGuard::new(
            sink.open_flag(),
            Box::new(move || provider.cancel(token)),
        );
        ResultStream::new(rx, guard)
    }
}
