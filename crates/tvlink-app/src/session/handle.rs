//! Session handle - the only way in to a running device session
//!
//! [`spawn_session`] moves a [`DeviceSession`] into its own task. Intents and
//! poll ticks are queued to that task and handled one at a time; every
//! intent gets exactly one reply, [`Error::SessionClosed`] included.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::session::{DeviceSession, SessionSnapshot};
use crate::scheduler::PollScheduler;
use tvlink_adb::{CommandRunner, WakeOnLan};
use tvlink_core::prelude::*;
use tvlink_core::{SessionPhase, SourceId};

/// Queued intents per session before senders wait
const REQUEST_QUEUE_SIZE: usize = 32;

/// Messages handled by a session task
#[derive(Debug)]
pub(crate) enum SessionRequest {
    SetPower {
        on: bool,
        reply: oneshot::Sender<Result<()>>,
    },
    SetSource {
        id: SourceId,
        reply: oneshot::Sender<Result<()>>,
    },
    Refresh {
        reply: oneshot::Sender<Result<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle to a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    name: String,
    address: String,
    tx: mpsc::Sender<SessionRequest>,
}

impl SessionHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether the session task has exited
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub async fn set_power(&self, on: bool) -> Result<()> {
        self.request(|reply| SessionRequest::SetPower { on, reply })
            .await?
    }

    /// Switch input source; waits behind any switch already queued
    pub async fn set_source(&self, id: SourceId) -> Result<()> {
        self.request(|reply| SessionRequest::SetSource { id, reply })
            .await?
    }

    /// Reconcile now instead of waiting for the next poll
    pub async fn refresh(&self) -> Result<()> {
        self.request(|reply| SessionRequest::Refresh { reply }).await?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        self.request(|reply| SessionRequest::Snapshot { reply }).await
    }

    /// Stop polling and end the session task
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| SessionRequest::Shutdown { reply }).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionRequest,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| Error::SessionClosed)?;
        reply_rx.await.map_err(|_| Error::SessionClosed)
    }
}

/// Start a session task: initialize, then serve intents and poll ticks
pub fn spawn_session<R, W>(session: DeviceSession<R, W>) -> (SessionHandle, JoinHandle<()>)
where
    R: CommandRunner + Sync + 'static,
    W: WakeOnLan + Sync + 'static,
{
    let (tx, rx) = mpsc::channel(REQUEST_QUEUE_SIZE);
    let handle = SessionHandle {
        name: session.identity().name.clone(),
        address: session.address().to_string(),
        tx,
    };
    let task = tokio::spawn(run_session(session, rx));
    (handle, task)
}

async fn run_session<R, W>(mut session: DeviceSession<R, W>, mut requests: mpsc::Receiver<SessionRequest>)
where
    R: CommandRunner + Sync,
    W: WakeOnLan + Sync,
{
    session.initialize().await;

    let interval: Duration = session.interval();
    let (mut scheduler, mut ticks) = PollScheduler::start(interval);
    debug!(address = %session.address(), "Polling every {:?}", interval);

    let mut shutdown_reply = None;

    loop {
        tokio::select! {
            biased;

            request = requests.recv() => match request {
                Some(SessionRequest::Shutdown { reply }) => {
                    shutdown_reply = Some(reply);
                    break;
                }
                Some(request) => handle_request(&mut session, request).await,
                None => break,
            },

            Some(()) = ticks.recv() => {
                if session.phase().is_polling() {
                    // failures are accounted inside the session
                    let _ = session.reconcile().await;
                }
            }
        }

        if session.phase() == SessionPhase::Stopped && !scheduler.is_cancelled() {
            warn!(address = %session.address(), "Polling stopped, intents are still accepted");
            scheduler.cancel();
        }
    }

    scheduler.cancel();
    info!(address = %session.address(), "Session ended");

    if let Some(reply) = shutdown_reply {
        let _ = reply.send(());
    }
}

async fn handle_request<R, W>(session: &mut DeviceSession<R, W>, request: SessionRequest)
where
    R: CommandRunner + Sync,
    W: WakeOnLan + Sync,
{
    match request {
        SessionRequest::SetPower { on, reply } => {
            let result = session.set_power(on).await;
            let _ = reply.send(result);
        }
        SessionRequest::SetSource { id, reply } => {
            let result = session.set_source(id).await;
            let _ = reply.send(result);
        }
        SessionRequest::Refresh { reply } => {
            let result = session.reconcile().await;
            let _ = reply.send(result);
        }
        SessionRequest::Snapshot { reply } => {
            let _ = reply.send(session.snapshot());
        }
        SessionRequest::Shutdown { reply } => {
            let _ = reply.send(());
        }
    }
}
