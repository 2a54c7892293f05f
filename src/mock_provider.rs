//! Enqueue-style mock providers used to exercise the bridges in tests.
//!
//! Responses are queued ahead of a request and replayed through the
//! installed callbacks, so event sequences are fully deterministic.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::{ExportPreset, ImageRequestOptions, VideoRequestOptions};
use crate::errors::ProviderFailure;
use crate::provider::{
    DataResultHandler, ExportHandle, ExportHandleResultHandler, ExportProvider,
    ImageResultHandler, MediaProvider, ProgressHandler,
};
use crate::types::{
    AssetRef, ContainerFormat, ContentMode, ExportStatus, ImageArtifact, RequestToken, TargetSize,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One canned response replayed when a fetch request comes in.
#[derive(Clone)]
pub enum MockResponse {
    /// Invokes the request's progress handler.
    Progress(f32),
    /// Invokes the progress handler with an error.
    ProgressError(ProviderFailure),
    /// Delivers an image artifact through the result callback.
    Image(ImageArtifact),
    /// Delivers a data blob through the result callback.
    Data(Bytes),
    /// Delivers a provider error through the result callback.
    Error(ProviderFailure),
    /// Delivers an empty result: no artifact and no error.
    Empty,
}

/// Mock image/data provider. Replays every enqueued response, in order,
/// synchronously inside the request call.
#[derive(Default)]
pub struct MockMediaProvider {
    responses: Mutex<VecDeque<MockResponse>>,
    cancel_count: AtomicUsize,
    last_cancelled: Mutex<Option<RequestToken>>,
}

impl MockMediaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, response: MockResponse) {
        lock(&self.responses).push_back(response);
    }

    pub fn cancel_count(&self) -> usize {
        self.cancel_count.load(Ordering::SeqCst)
    }

    pub fn last_cancelled(&self) -> Option<RequestToken> {
        *lock(&self.last_cancelled)
    }

    fn drain(&self) -> Vec<MockResponse> {
        lock(&self.responses).drain(..).collect()
    }
}

impl MediaProvider for MockMediaProvider {
    fn request_image(
        &self,
        _asset: &AssetRef,
        _target_size: TargetSize,
        _content_mode: ContentMode,
        options: ImageRequestOptions,
        result: ImageResultHandler,
    ) -> RequestToken {
        for response in self.drain() {
            match response {
                MockResponse::Progress(progress) => {
                    if let Some(handler) = options.progress_handler.as_ref() {
                        handler(progress, None);
                    }
                }
                MockResponse::ProgressError(error) => {
                    if let Some(handler) = options.progress_handler.as_ref() {
                        handler(0.0, Some(error));
                    }
                }
                MockResponse::Image(artifact) => result(Some(artifact), None),
                MockResponse::Error(error) => result(None, Some(error)),
                MockResponse::Empty => result(None, None),
                MockResponse::Data(_) => {}
            }
        }
        RequestToken::new()
    }

    fn request_data(
        &self,
        _asset: &AssetRef,
        options: ImageRequestOptions,
        result: DataResultHandler,
    ) -> RequestToken {
        let mut result = Some(result);
        for response in self.drain() {
            match response {
                MockResponse::Progress(progress) => {
                    if let Some(handler) = options.progress_handler.as_ref() {
                        handler(progress, None);
                    }
                }
                MockResponse::ProgressError(error) => {
                    if let Some(handler) = options.progress_handler.as_ref() {
                        handler(0.0, Some(error));
                    }
                }
                MockResponse::Data(data) => {
                    if let Some(result) = result.take() {
                        result(Some(data), None);
                    }
                }
                MockResponse::Error(error) => {
                    if let Some(result) = result.take() {
                        result(None, Some(error));
                    }
                }
                MockResponse::Empty => {
                    if let Some(result) = result.take() {
                        result(None, None);
                    }
                }
                MockResponse::Image(_) => {}
            }
        }
        RequestToken::new()
    }

    fn cancel(&self, token: RequestToken) {
        self.cancel_count.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_cancelled) = Some(token);
    }
}

/// Mock export handle. Once `begin_export` has been called, each `status()`
/// read advances the scripted `(status, progress)` steps by one, so one
/// poller tick observes exactly one step.
pub struct MockExportHandle {
    state: Mutex<(ExportStatus, f32)>,
    error: Mutex<Option<ProviderFailure>>,
    output_path: Mutex<Option<PathBuf>>,
    compatible: Mutex<Vec<ContainerFormat>>,
    script: Mutex<VecDeque<(ExportStatus, f32)>>,
    export_started: AtomicBool,
    cancel_count: AtomicUsize,
}

impl Default for MockExportHandle {
    fn default() -> Self {
        Self {
            state: Mutex::new((ExportStatus::Waiting, 0.0)),
            error: Mutex::new(None),
            output_path: Mutex::new(None),
            compatible: Mutex::new(vec![ContainerFormat::Mov]),
            script: Mutex::new(VecDeque::new()),
            export_started: AtomicBool::new(false),
            cancel_count: AtomicUsize::new(0),
        }
    }
}

impl MockExportHandle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_compatible_formats(&self, formats: Vec<ContainerFormat>) {
        *lock(&self.compatible) = formats;
    }

    /// Scripts the status/progress sequence observed tick by tick after
    /// `begin_export`.
    pub fn script_export(&self, steps: Vec<(ExportStatus, f32)>) {
        *lock(&self.script) = steps.into();
    }

    pub fn fail_with(&self, error: ProviderFailure) {
        *lock(&self.error) = Some(error);
    }

    pub fn export_started(&self) -> bool {
        self.export_started.load(Ordering::SeqCst)
    }

    pub fn cancel_count(&self) -> usize {
        self.cancel_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExportHandle for MockExportHandle {
    fn status(&self) -> ExportStatus {
        if self.export_started.load(Ordering::SeqCst) {
            if let Some(step) = lock(&self.script).pop_front() {
                *lock(&self.state) = step;
            }
        }
        lock(&self.state).0
    }

    fn progress(&self) -> f32 {
        lock(&self.state).1
    }

    fn error(&self) -> Option<ProviderFailure> {
        lock(&self.error).clone()
    }

    fn output_path(&self) -> Option<PathBuf> {
        lock(&self.output_path).clone()
    }

    fn set_output_path(&self, path: PathBuf) {
        *lock(&self.output_path) = Some(path);
    }

    async fn compatible_formats(&self) -> Vec<ContainerFormat> {
        lock(&self.compatible).clone()
    }

    fn begin_export(&self) {
        self.export_started.store(true, Ordering::SeqCst);
    }

    fn cancel_export(&self) {
        self.cancel_count.fetch_add(1, Ordering::SeqCst);
        lock(&self.state).0 = ExportStatus::Cancelled;
    }
}

/// Mock export provider. Captures the installed network progress handler so
/// tests can fire it at any time, and either answers the handle request
/// immediately (`respond_with`) or holds the callback for `deliver_handle`.
#[derive(Default)]
pub struct MockExportProvider {
    armed_response: Mutex<Option<(Option<Arc<MockExportHandle>>, Option<ProviderFailure>)>>,
    pending_result: Mutex<Option<ExportHandleResultHandler>>,
    progress_handler: Mutex<Option<ProgressHandler>>,
    cancel_count: AtomicUsize,
    last_cancelled: Mutex<Option<RequestToken>>,
}

impl MockExportProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms an immediate answer for the next handle request.
    pub fn respond_with(
        &self,
        handle: Option<Arc<MockExportHandle>>,
        error: Option<ProviderFailure>,
    ) {
        *lock(&self.armed_response) = Some((handle, error));
    }

    /// Answers a request that was left pending.
    pub fn deliver_handle(
        &self,
        handle: Option<Arc<MockExportHandle>>,
        error: Option<ProviderFailure>,
    ) {
        if let Some(result) = lock(&self.pending_result).take() {
            result(handle.map(|h| h as Arc<dyn ExportHandle>), error);
        }
    }

    /// Invokes the captured network-fetch progress handler.
    pub fn fire_network_progress(&self, progress: f32) {
        let handler = lock(&self.progress_handler).clone();
        if let Some(handler) = handler {
            handler(progress, None);
        }
    }

    /// Invokes the captured network-fetch progress handler with an error.
    pub fn fire_network_error(&self, error: ProviderFailure) {
        let handler = lock(&self.progress_handler).clone();
        if let Some(handler) = handler {
            handler(0.0, Some(error));
        }
    }

    pub fn cancel_count(&self) -> usize {
        self.cancel_count.load(Ordering::SeqCst)
    }

    pub fn last_cancelled(&self) -> Option<RequestToken> {
        *lock(&self.last_cancelled)
    }
}

impl ExportProvider for MockExportProvider {
    fn request_export_handle(
        &self,
        _asset: &AssetRef,
        options: VideoRequestOptions,
        _preset: ExportPreset,
        result: ExportHandleResultHandler,
    ) -> RequestToken {
        *lock(&self.progress_handler) = options.progress_handler.clone();
        match lock(&self.armed_response).take() {
            Some((handle, error)) => {
                result(handle.map(|h| h as Arc<dyn ExportHandle>), error);
            }
            None => {
                *lock(&self.pending_result) = Some(result);
            }
        }
        RequestToken::new()
    }

    fn cancel(&self, token: RequestToken) {
        self.cancel_count.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_cancelled) = Some(token);
    }
}
