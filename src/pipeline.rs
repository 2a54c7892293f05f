use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio_stream::Stream;
use tracing::debug;

use crate::config::{ExportPreset, ExporterConfig, VideoRequestOptions};
use crate::exporter::VideoExporter;
use crate::provider::ExportProvider;
use crate::stream::{progress_to_sink, CancelGuard, EventSink, ResultStream};
use crate::types::{AssetRef, MediaResult};

/// Merge state: the export stream's first event retires the fetch stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeState {
    WatchingBoth,
    CommittedToExport,
}

/// Two-input selection combinator. Forwards the fetch stream's events until
/// the export stream produces its first event of any kind; from then on only
/// the export stream is consulted. Terminates when the export stream does,
/// or early if the fetch stream fails first.
pub struct ProgressMerge<A, B> {
    fetch: Option<A>,
    export: Option<B>,
    state: MergeState,
    done: bool,
}

impl<A, B> ProgressMerge<A, B> {
    pub fn new(fetch: A, export: B) -> Self {
        Self {
            fetch: Some(fetch),
            export: Some(export),
            state: MergeState::WatchingBoth,
            done: false,
        }
    }
}

impl<T, A, B> Stream for ProgressMerge<A, B>
where
    A: Stream<Item = MediaResult<T>> + Unpin,
    B: Stream<Item = MediaResult<T>> + Unpin,
{
    type Item = MediaResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        if let Some(export) = this.export.as_mut() {
            match Pin::new(export).poll_next(cx) {
                Poll::Ready(Some(event)) => {
                    if this.state == MergeState::WatchingBoth {
                        debug!("export stream reporting, fetch progress retired");
                        this.state = MergeState::CommittedToExport;
                        this.fetch = None;
                    }
                    return Poll::Ready(Some(event));
                }
                Poll::Ready(None) => {
                    this.done = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => {}
            }
        }

        if this.state == MergeState::WatchingBoth {
            if let Some(fetch) = this.fetch.as_mut() {
                match Pin::new(fetch).poll_next(cx) {
                    Poll::Ready(Some(event)) => {
                        if event.error().is_some() {
                            // A fetch failure before the export ever reports
                            // ends the pipeline; dropping the export stream
                            // runs its cancellation.
                            this.done = true;
                            this.fetch = None;
                            this.export = None;
                        }
                        return Poll::Ready(Some(event));
                    }
                    Poll::Ready(None) => {
                        this.fetch = None;
                    }
                    Poll::Pending => {}
                }
            }
        }

        Poll::Pending
    }
}

/// Output of [`VideoPipeline::export_video`].
pub type VideoExportStream = ProgressMerge<ResultStream<PathBuf>, ResultStream<PathBuf>>;

/// Merges the provider's network-fetch progress with the export bridge into
/// one timeline: download progress until the export handle starts reporting,
/// export progress and result from then on.
pub struct VideoPipeline {
    exporter: VideoExporter,
}

impl VideoPipeline {
    pub fn new(provider: Arc<dyn ExportProvider>, config: ExporterConfig) -> Self {
        Self {
            exporter: VideoExporter::new(provider, config),
        }
    }

    /// Exports a video asset to `destination`, reporting remote fetch
    /// progress while the source is still being downloaded. Dropping the
    /// stream cancels whichever native operation is still in flight.
    pub fn export_video(
        &self,
        asset: &AssetRef,
        mut options: VideoRequestOptions,
        preset: ExportPreset,
        destination: &Path,
    ) -> VideoExportStream {
        let (fetch_sink, fetch_rx) = EventSink::channel();
        // The fetch progress callback belongs to the same native request the
        // exporter cancels, so this stream needs no cleanup of its own.
        options.progress_handler = Some(progress_to_sink(fetch_sink));
        let fetch_events = ResultStream::new(fetch_rx, CancelGuard::inert());

        let export_events = self.exporter.export(asset, options, preset, destination);
        ProgressMerge::new(fetch_events, export_events)
    }
}
