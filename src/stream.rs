use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tokio_stream::Stream;
use tracing::debug;

use crate::errors::BridgeError;
use crate::provider::ProgressHandler;
use crate::types::MediaResult;

pub(crate) enum StreamEvent<T> {
    Next(MediaResult<T>),
    Completed,
}

/// Producer side of a bridged stream. Provider callbacks and the poller all
/// publish through one of these; a single consumer channel keeps events in
/// emission order.
pub struct EventSink<T> {
    tx: mpsc::UnboundedSender<StreamEvent<T>>,
    open: Arc<AtomicBool>,
}

impl<T> Clone for EventSink<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            open: Arc::clone(&self.open),
        }
    }
}

impl<T> EventSink<T> {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<StreamEvent<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                open: Arc::new(AtomicBool::new(true)),
            },
            rx,
        )
    }

    /// Publishes an event. Silently dropped once the sink is completed or the
    /// consumer has gone away.
    pub fn emit(&self, event: MediaResult<T>) {
        if !self.open.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.tx.send(StreamEvent::Next(event));
    }

    /// Closes the sink. Idempotent; later `emit` calls become no-ops.
    pub fn complete(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            let _ = self.tx.send(StreamEvent::Completed);
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Shared flag that flips to `false` on completion. Used by
    /// [`CancelGuard`] to skip cleanup for naturally finished streams.
    pub fn open_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.open)
    }
}

/// Runs a cleanup closure when the owning stream is dropped before its sink
/// completed. Natural completion disarms it, so cancelling a finished stream
/// is a no-op.
pub struct CancelGuard {
    open: Arc<AtomicBool>,
    cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl CancelGuard {
    pub fn new(open: Arc<AtomicBool>, cleanup: Box<dyn FnOnce() + Send>) -> Self {
        Self {
            open,
            cleanup: Some(cleanup),
        }
    }

    /// Guard that never fires, for streams with no cleanup of their own.
    pub fn inert() -> Self {
        Self {
            open: Arc::new(AtomicBool::new(false)),
            cleanup: None,
        }
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if self.open.load(Ordering::SeqCst) {
            if let Some(cleanup) = self.cleanup.take() {
                debug!("stream dropped before completion, running cancellation");
                cleanup();
            }
        }
    }
}

/// Consumer side of a bridged operation: an ordered sequence of
/// [`MediaResult`] events ending at the sink's completion marker. Dropping it
/// early triggers the guard's provider cancellation.
pub struct ResultStream<T> {
    rx: mpsc::UnboundedReceiver<StreamEvent<T>>,
    _guard: CancelGuard,
    done: bool,
}

impl<T> ResultStream<T> {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<StreamEvent<T>>, guard: CancelGuard) -> Self {
        Self {
            rx,
            _guard: guard,
            done: false,
        }
    }
}

impl<T> Stream for ResultStream<T> {
    type Item = MediaResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(StreamEvent::Next(event))) => Poll::Ready(Some(event)),
            Poll::Ready(Some(StreamEvent::Completed)) | Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Adapts a provider progress callback into sink events: plain progress maps
/// to `Processing`, an error ends the stream with `Failure`.
pub(crate) fn progress_to_sink<T: Send + 'static>(sink: EventSink<T>) -> ProgressHandler {
    Arc::new(move |progress, error| match error {
        Some(failure) => {
            sink.emit(MediaResult::Failure(BridgeError::Provider(failure)));
            sink.complete();
        }
        None => sink.emit(MediaResult::Processing(progress)),
    })
}
