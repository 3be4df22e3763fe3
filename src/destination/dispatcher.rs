//! Background notification dispatcher.
//!
//! Callers enqueue messages on a bounded channel and get a
//! `PendingDelivery` back. A dedicated worker thread publishes each message
//! through `Notification` in submission order. `submit` never blocks: a
//! full queue is reported to the caller.

use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::error::{AlertingError, AlertingResult, ExecutionError};

use super::message::DestinationMessage;
use super::registry::Notification;
use super::response::DestinationResponse;

const WORKER_PATH: &str = "notification_dispatcher";
const REPLY_PATH: &str = "notification_reply";

#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Max queued messages before `submit` reports `QueueFull`.
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { queue_capacity: 1024 }
    }
}

#[derive(Debug)]
struct DispatchJob {
    message: DestinationMessage,
    reply: Sender<AlertingResult<DestinationResponse>>,
}

/// Handle to the outcome of a submitted message.
#[derive(Debug)]
pub struct PendingDelivery {
    rx: Receiver<AlertingResult<DestinationResponse>>,
}

impl PendingDelivery {
    /// Blocks until the worker has published the message.
    pub fn wait(self) -> AlertingResult<DestinationResponse> {
        self.rx.recv().map_err(|_| disconnected(REPLY_PATH))?
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> AlertingResult<DestinationResponse> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => AlertingError::Execution(ExecutionError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            RecvTimeoutError::Disconnected => disconnected(REPLY_PATH),
        })?
    }
}

fn disconnected(path: &str) -> AlertingError {
    AlertingError::Execution(ExecutionError::Disconnected {
        path: path.to_string(),
    })
}

/// Publishes messages on a dedicated worker thread.
#[derive(Debug)]
pub struct NotificationDispatcher {
    capacity: usize,
    tx: Mutex<Option<Sender<DispatchJob>>>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationDispatcher {
    /// Spawns the worker.
    pub fn new(cfg: DispatcherConfig, notification: Notification) -> AlertingResult<Self> {
        let capacity = cfg.queue_capacity.max(1);
        let (tx, rx) = bounded::<DispatchJob>(capacity);

        let join = thread::Builder::new()
            .name("kyroalert-dispatch".to_string())
            .spawn(move || worker_loop(&notification, &rx))
            .map_err(|e| AlertingError::internal(format!("failed to spawn dispatcher: {e}")))?;

        Ok(Self {
            capacity,
            tx: Mutex::new(Some(tx)),
            join: Mutex::new(Some(join)),
        })
    }

    /// Queue capacity after clamping.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueues `message` without blocking.
    pub fn submit(&self, message: DestinationMessage) -> AlertingResult<PendingDelivery> {
        let guard = self.tx.lock().map_err(|_| disconnected(WORKER_PATH))?;
        let tx = guard.as_ref().ok_or_else(|| disconnected(WORKER_PATH))?;

        let (reply, rx) = bounded(1);
        match tx.try_send(DispatchJob { message, reply }) {
            Ok(()) => Ok(PendingDelivery { rx }),
            Err(TrySendError::Full(job)) => {
                tracing::warn!(
                    channel = job.message.channel_name(),
                    capacity = self.capacity,
                    "dispatch queue full"
                );
                Err(ExecutionError::QueueFull {
                    capacity: self.capacity,
                }
                .into())
            }
            Err(TrySendError::Disconnected(_)) => Err(disconnected(WORKER_PATH)),
        }
    }

    /// Stops accepting messages, drains the queue and joins the worker.
    pub fn shutdown(&self) {
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
        let handle = self.join.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("dispatcher worker panicked");
            }
        }
    }
}

impl Drop for NotificationDispatcher {
    fn drop(&mut self) {
        // Closing the sender lets the worker drain and exit; it is detached, not joined.
        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }
        if let Ok(mut guard) = self.join.lock() {
            drop(guard.take());
        }
    }
}

fn worker_loop(notification: &Notification, rx: &Receiver<DispatchJob>) {
    for DispatchJob { message, reply } in rx.iter() {
        let result = notification.publish(&message);
        if let Err(err) = &result {
            tracing::warn!(channel = message.channel_name(), error = %err, "dispatch failed");
        }
        // Receiver may have been dropped; the send itself already happened.
        let _ = reply.send(result);
    }
    tracing::debug!("dispatcher worker exiting");
}
