//! Serialized device list reloads.
//!
//! A single actor owns refreshes of the [`DeviceLabelCache`]. Requests
//! arrive on one FIFO queue, either fire-and-forget (SIGHUP) or with a reply
//! slot (`POST /-/reload`). At most one refresh is in flight at any time.

use std::sync::Arc;

use switchbot_client::{ClientError, DeviceClient};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::{DeviceLabelCache, RefreshSummary};

/// Pending reloads the queue holds before senders wait.
const QUEUE_CAPACITY: usize = 16;

/// Errors reported to a caller waiting for a reload.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("reload coordinator is not running")]
    Stopped,

    #[error(transparent)]
    Refresh(#[from] ClientError),
}

type Reply = oneshot::Sender<Result<RefreshSummary, ClientError>>;

/// What asked for a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadSource {
    Signal,
    Request,
}

#[derive(Debug)]
struct ReloadRequest {
    source: ReloadSource,
    reply: Option<Reply>,
}

/// Cloneable handle used to queue reloads.
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    tx: mpsc::Sender<ReloadRequest>,
}

impl ReloadHandle {
    /// Queue a reload and wait for its result.
    pub async fn reload(&self) -> Result<RefreshSummary, ReloadError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ReloadRequest {
                source: ReloadSource::Request,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| ReloadError::Stopped)?;

        let result = reply_rx.await.map_err(|_| ReloadError::Stopped)?;
        Ok(result?)
    }

    /// Queue a reload without waiting for it to run.
    pub async fn trigger(&self) -> Result<(), ReloadError> {
        self.tx
            .send(ReloadRequest {
                source: ReloadSource::Signal,
                reply: None,
            })
            .await
            .map_err(|_| ReloadError::Stopped)
    }
}

/// The actor that performs reloads.
pub struct ReloadCoordinator {
    cache: Arc<DeviceLabelCache>,
    client: Arc<dyn DeviceClient>,
    rx: mpsc::Receiver<ReloadRequest>,
}

impl ReloadCoordinator {
    /// Create the coordinator and the handle feeding it.
    pub fn new(cache: Arc<DeviceLabelCache>, client: Arc<dyn DeviceClient>) -> (Self, ReloadHandle) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        (Self { cache, client, rx }, ReloadHandle { tx })
    }

    /// Create the coordinator and run it on a new task.
    pub fn spawn(
        cache: Arc<DeviceLabelCache>,
        client: Arc<dyn DeviceClient>,
    ) -> (ReloadHandle, JoinHandle<()>) {
        let (coordinator, handle) = Self::new(cache, client);
        let task = tokio::spawn(coordinator.run());
        (handle, task)
    }

    /// Process reloads until every handle is dropped.
    pub async fn run(mut self) {
        debug!("Reload coordinator started");

        while let Some(request) = self.rx.recv().await {
            let result = self.cache.refresh(self.client.as_ref()).await;

            match (&result, request.source) {
                (Ok(_), source) => info!(?source, "Reloaded devices"),
                (Err(e), source) => error!(?source, error = %e, "Error reloading devices"),
            }

            if let Some(reply) = request.reply {
                // The caller may have gone away; the refresh still counts.
                let _ = reply.send(result);
            }
        }

        debug!("Reload coordinator stopped");
    }
}

/// Install the SIGHUP handler.
///
/// Must run before any hang-up is expected: until the stream exists the
/// default action applies and terminates the process.
#[cfg(unix)]
pub fn hangup_signal() -> std::io::Result<tokio::signal::unix::Signal> {
    use tokio::signal::unix::{SignalKind, signal};

    signal(SignalKind::hangup())
}

/// Queue a reload on every SIGHUP until the signal stream ends.
#[cfg(unix)]
pub async fn watch_hangup(mut hangup: tokio::signal::unix::Signal, handle: ReloadHandle) {
    while hangup.recv().await.is_some() {
        info!("Received SIGHUP, reloading devices");
        if handle.trigger().await.is_err() {
            break;
        }
    }
}
