//! # Queue-backed dispatcher.
//!
//! [`QueueDispatcher`] owns a dedicated worker task draining a channel of
//! jobs. Enqueue never blocks; execution order is queue order.
//!
//! ```text
//!    dispatch(job) ──► [queue] ──► worker task ──► job()
//!                     (bounded            └────► panic caught & logged
//!                   or unbounded)
//! ```
//!
//! ## Rules
//! - A panicking job is caught and logged; the worker keeps draining.
//! - `shutdown` closes the queue and waits until every accepted job ran.
//! - `abort` stops the worker immediately; queued jobs are discarded.
//! - After either, `dispatch` returns [`DispatchError::Closed`].
//!
//! Construction spawns the worker, so a tokio runtime must be current.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatch::{Dispatch, Job};
use crate::error::DispatchError;

enum QueueSender {
    Bounded(mpsc::Sender<Job>),
    Unbounded(mpsc::UnboundedSender<Job>),
}

/// Dispatcher backed by a channel and one worker task.
pub struct QueueDispatcher {
    sender: Mutex<Option<QueueSender>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    token: CancellationToken,
    capacity: usize,
}

impl QueueDispatcher {
    /// Creates a dispatcher with a bounded queue.
    ///
    /// When the queue is full, `dispatch` rejects the job with
    /// [`DispatchError::Saturated`] instead of blocking the producer.
    pub fn bounded(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel::<Job>(capacity);
        let token = CancellationToken::new();
        let worker = Self::spawn_worker(Receiver::Bounded(rx), token.clone());
        Self {
            sender: Mutex::new(Some(QueueSender::Bounded(tx))),
            worker: Mutex::new(Some(worker)),
            token,
            capacity,
        }
    }

    /// Creates a dispatcher with an unbounded queue.
    ///
    /// Fan-out lanes use this: the fallback-delivery rule deliberately pushes
    /// past demand under exhaustion, and the lane queue absorbs the overflow.
    pub fn unbounded() -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let token = CancellationToken::new();
        let worker = Self::spawn_worker(Receiver::Unbounded(rx), token.clone());
        Self {
            sender: Mutex::new(Some(QueueSender::Unbounded(tx))),
            worker: Mutex::new(Some(worker)),
            token,
            capacity: 0,
        }
    }

    fn spawn_worker(mut rx: Receiver, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    job = rx.recv() => match job {
                        Some(job) => run_job(job),
                        None => break,
                    },
                }
            }
        })
    }

    /// Graceful shutdown: stop accepting, drain the queue, await the worker.
    pub async fn shutdown(&self) {
        drop(self.take_sender());
        let handle = {
            let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
            worker.take()
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Hard stop: the worker exits at the next scheduling point and queued
    /// jobs are discarded.
    pub fn abort(&self) {
        drop(self.take_sender());
        self.token.cancel();
    }

    fn take_sender(&self) -> Option<QueueSender> {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Dispatch for QueueDispatcher {
    fn dispatch(&self, job: Job) -> Result<(), DispatchError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            None => Err(DispatchError::Closed),
            Some(QueueSender::Unbounded(tx)) => {
                tx.send(job).map_err(|_| DispatchError::Closed)
            }
            Some(QueueSender::Bounded(tx)) => match tx.try_send(job) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(_)) => Err(DispatchError::Saturated {
                    capacity: self.capacity,
                }),
                Err(mpsc::error::TrySendError::Closed(_)) => Err(DispatchError::Closed),
            },
        }
    }
}

enum Receiver {
    Bounded(mpsc::Receiver<Job>),
    Unbounded(mpsc::UnboundedReceiver<Job>),
}

impl Receiver {
    async fn recv(&mut self) -> Option<Job> {
        match self {
            Receiver::Bounded(rx) => rx.recv().await,
            Receiver::Unbounded(rx) => rx.recv().await,
        }
    }
}

fn run_job(job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        let reason = panic_reason(&payload);
        tracing::error!(%reason, "dispatcher job panicked");
    }
}

pub(crate) fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("opaque panic payload")
    }
}
