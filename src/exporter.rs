use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::debug;

use crate::config::{ExportPreset, ExporterConfig, VideoRequestOptions};
use crate::errors::{BridgeError, ProviderFailure};
use crate::poller::{HandleSnapshot, PollControl, PollPublisher, ProgressPoller};
use crate::provider::{ExportHandle, ExportHandleResultHandler, ExportProvider};
use crate::stream::{CancelGuard, EventSink, ResultStream};
use crate::types::{AssetRef, ContainerFormat, ExportStatus, MediaResult, RequestToken};

/// Cancellation state for one export invocation. Before the provider answers
/// only the request token exists; afterwards the export handle supersedes it.
struct ExportInvocation {
    token: Option<RequestToken>,
    handle: Option<Arc<dyn ExportHandle>>,
}

fn lock(invocation: &Mutex<ExportInvocation>) -> MutexGuard<'_, ExportInvocation> {
    invocation.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drives the two-phase export flow (acquire handle, confirm container
/// compatibility, export while polling) as a single stream.
pub struct VideoExporter {
    provider: Arc<dyn ExportProvider>,
    config: ExporterConfig,
}

impl VideoExporter {
    pub fn new(provider: Arc<dyn ExportProvider>, config: ExporterConfig) -> Self {
        Self { provider, config }
    }

    /// Exports an asset to `destination`.
    ///
    /// Emits `Processing` while the export handle reports waiting/exporting,
    /// one `Success(destination)` on completion, or one `Failure` if the
    /// handle is never acquired, the format is unsupported, or the export
    /// ends failed/cancelled. Dropping the stream early cancels exactly one
    /// of: the acquired export handle, or the still-pending handle request.
    pub fn export(
        &self,
        asset: &AssetRef,
        options: VideoRequestOptions,
        preset: ExportPreset,
        destination: &Path,
    ) -> ResultStream<PathBuf> {
        let (sink, rx) = EventSink::channel();
        let destination = destination.to_path_buf();

        let poller = Arc::new(ProgressPoller::new(
            self.config.poll_interval,
            export_publisher(sink.clone(), destination.clone()),
        ));

        let invocation = Arc::new(Mutex::new(ExportInvocation {
            token: None,
            handle: None,
        }));

        let (handle_tx, handle_rx) = oneshot::channel();
        let result: ExportHandleResultHandler = Box::new(move |handle, error| {
            let _ = handle_tx.send((handle, error));
        });
        let token = self
            .provider
            .request_export_handle(asset, options, preset, result);
        lock(&invocation).token = Some(token);
        debug!(asset = %asset.local_id, ?token, "export handle requested");

        let driver = tokio::spawn(drive_export(
            handle_rx,
            sink.clone(),
            Arc::clone(&invocation),
            Arc::clone(&poller),
            destination,
            self.config.required_format,
        ));

        let guard_provider = Arc::clone(&self.provider);
        let guard = CancelGuard::new(
            sink.open_flag(),
            Box::new(move || {
                driver.abort();
                poller.detach();
                let state = lock(&invocation);
                // Exactly one cancellation path fires: the export handle if
                // one was acquired, otherwise the pending native request.
                if let Some(handle) = state.handle.as_ref() {
                    handle.cancel_export();
                } else if let Some(token) = state.token {
                    guard_provider.cancel(token);
                }
            }),
        );
        ResultStream::new(rx, guard)
    }
}

/// Maps each poller snapshot to stream events and decides when the timer
/// stops. `Unknown` is transient and never terminal.
fn export_publisher(sink: EventSink<PathBuf>, destination: PathBuf) -> PollPublisher {
    Arc::new(move |snapshot: HandleSnapshot| match snapshot.status {
        ExportStatus::Completed => {
            sink.emit(MediaResult::Success(destination.clone()));
            sink.complete();
            PollControl::Stop
        }
        ExportStatus::Failed | ExportStatus::Cancelled => {
            let error = snapshot
                .error
                .map(BridgeError::Provider)
                .unwrap_or(BridgeError::ExportFailed {
                    status: snapshot.status,
                });
            sink.emit(MediaResult::Failure(error));
            sink.complete();
            PollControl::Stop
        }
        ExportStatus::Unknown | ExportStatus::Waiting | ExportStatus::Exporting => {
            sink.emit(MediaResult::Processing(snapshot.progress));
            PollControl::Continue
        }
    })
}

type HandleResponse = (Option<Arc<dyn ExportHandle>>, Option<ProviderFailure>);

async fn drive_export(
    handle_rx: oneshot::Receiver<HandleResponse>,
    sink: EventSink<PathBuf>,
    invocation: Arc<Mutex<ExportInvocation>>,
    poller: Arc<ProgressPoller>,
    destination: PathBuf,
    required_format: ContainerFormat,
) {
    let (handle, error) = match handle_rx.await {
        Ok(response) => response,
        // Provider dropped the callback without answering; the request is
        // already torn down.
        Err(_) => return,
    };
    let handle = match handle {
        Some(handle) => handle,
        None => {
            sink.emit(MediaResult::Failure(BridgeError::FetchFailed));
            sink.complete();
            return;
        }
    };
    if let Some(error) = error {
        sink.emit(MediaResult::Failure(BridgeError::Provider(error)));
        sink.complete();
        return;
    }

    handle.set_output_path(destination);
    lock(&invocation).handle = Some(Arc::clone(&handle));
    poller.attach(Arc::downgrade(&handle));
    debug!("export handle acquired, checking container compatibility");

    let formats = handle.compatible_formats().await;
    if !formats.contains(&required_format) {
        poller.detach();
        sink.emit(MediaResult::Failure(BridgeError::UnsupportedFormat {
            format: required_format,
        }));
        sink.complete();
        return;
    }

    handle.begin_export();
    debug!("export started, terminal state observed by poller");
}
