use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use crate::errors::ProviderFailure;
use crate::provider::ExportHandle;
use crate::types::ExportStatus;

/// One sample of an export handle's observable state, taken on a poller tick.
#[derive(Debug, Clone)]
pub struct HandleSnapshot {
    pub status: ExportStatus,
    pub progress: f32,
    pub error: Option<ProviderFailure>,
}

/// Returned by the publish closure to keep or stop the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    Continue,
    Stop,
}

/// Receives each tick's snapshot. Publishing into a closed sink must be a
/// silent no-op; the closure itself never fails.
pub type PollPublisher = Arc<dyn Fn(HandleSnapshot) -> PollControl + Send + Sync>;

/// Periodically samples a live export handle and republishes its progress.
///
/// Holds only a weak reference: the handle's lifetime is governed by the
/// bridge invocation that created it, never by the timer. If the handle
/// disappears mid-tick the poller stops itself.
pub struct ProgressPoller {
    period: Duration,
    publish: PollPublisher,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl ProgressPoller {
    pub fn new(period: Duration, publish: PollPublisher) -> Self {
        Self {
            period,
            publish,
            timer: Mutex::new(None),
        }
    }

    /// Starts sampling `handle` every period. Replaces any previously
    /// attached handle, stopping its timer first; at most one timer runs per
    /// poller. A dead weak reference starts nothing.
    pub fn attach(&self, handle: Weak<dyn ExportHandle>) {
        self.stop_timer();
        if handle.strong_count() == 0 {
            debug!("poller attach skipped: handle already gone");
            return;
        }
        let publish = Arc::clone(&self.publish);
        let period = self.period;
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick fires immediately; sampling starts one
            // full period after attach, like a scheduled repeating timer.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let snapshot = match handle.upgrade() {
                    Some(handle) => HandleSnapshot {
                        status: handle.status(),
                        progress: handle.progress(),
                        error: handle.error(),
                    },
                    None => {
                        debug!("export handle dropped, stopping poller");
                        break;
                    }
                };
                if publish(snapshot) == PollControl::Stop {
                    break;
                }
            }
        });
        *self.timer_slot() = Some(task);
    }

    /// Stops the timer and drops the handle reference. Safe to call at any
    /// time, including when nothing is attached.
    pub fn detach(&self) {
        self.stop_timer();
    }

    pub fn is_attached(&self) -> bool {
        self.timer_slot()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    fn stop_timer(&self) {
        if let Some(task) = self.timer_slot().take() {
            task.abort();
        }
    }

    fn timer_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        // Poisoning is unrecoverable noise here; take the inner value either way.
        self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ProgressPoller {
    fn drop(&mut self) {
        self.stop_timer();
    }
}
