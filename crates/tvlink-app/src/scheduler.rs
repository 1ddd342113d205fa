//! Periodic poll ticks for a device session
//!
//! A tick is only a request: it lands in the session's queue and the session
//! decides whether to reconcile. Cancelling therefore stops future ticks and
//! never interrupts a reconciliation already in progress.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Owns the tick task; dropping it cancels polling
#[derive(Debug)]
pub struct PollScheduler {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    period: Duration,
}

impl PollScheduler {
    /// Start ticking every `period`, first tick one period from now
    ///
    /// Ticks are dropped rather than queued while the previous one is still
    /// waiting, so a slow device never builds up a backlog.
    pub fn start(period: Duration) -> (Self, mpsc::Receiver<()>) {
        let (tick_tx, tick_rx) = mpsc::channel(1);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match tick_tx.try_send(()) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(())) => {
                                tracing::trace!("Previous poll still pending, skipping tick");
                            }
                            Err(mpsc::error::TrySendError::Closed(())) => break,
                        }
                    }
                    result = shutdown_rx.changed() => {
                        if result.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        (
            Self {
                shutdown_tx,
                task: Some(task),
                period,
            },
            tick_rx,
        )
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_cancelled(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Stop issuing ticks; idempotent
    pub fn cancel(&mut self) {
        if self.is_cancelled() {
            return;
        }
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
