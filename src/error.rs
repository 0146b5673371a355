//! # Error types used by the dispatch runtime.
//!
//! [`DispatchError`] covers every failure a dispatch can produce, from a
//! consumer rejecting an event to the dispatcher's queue being gone.
//!
//! Each variant has a short stable label (`as_label`) used in logs and as the
//! fault key under which the error is re-routed to error consumers
//! (see [`DispatchError::fault_key`]).

use std::sync::Arc;

use thiserror::Error;

use crate::events::Key;

/// Shared handle to an error sink.
///
/// Receives every failure surfaced on a given dispatch path: the bus's
/// dispatch error handler, a router error sink, or a per-event hook.
pub type ErrorHook = Arc<dyn Fn(DispatchError) + Send + Sync>;

/// # Errors produced while dispatching events.
///
/// A consumer asking to be cancelled is **not** an error; that is the
/// [`Invocation::Cancel`](crate::Invocation::Cancel) outcome.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    /// A consumer rejected the event it was handling.
    #[error("consumer failed: {reason}")]
    Consumer { reason: String },

    /// A completion hook failed after routing finished.
    #[error("completion hook failed: {reason}")]
    Completion { reason: String },

    /// A consumer panicked; the panic was caught at the invoker boundary.
    #[error("consumer panicked: {reason}")]
    Panicked { reason: String },

    /// A typed consumer received a payload it cannot downcast.
    #[error("payload mismatch: expected {expected}")]
    PayloadMismatch { expected: &'static str },

    /// A bounded dispatcher queue was full; the task was rejected.
    #[error("dispatcher saturated at capacity {capacity}")]
    Saturated { capacity: usize },

    /// The dispatcher's worker is gone; nothing can be enqueued anymore.
    #[error("dispatcher closed")]
    Closed,
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::Consumer { .. } => "consumer_failed",
            DispatchError::Completion { .. } => "completion_failed",
            DispatchError::Panicked { .. } => "consumer_panicked",
            DispatchError::PayloadMismatch { .. } => "payload_mismatch",
            DispatchError::Saturated { .. } => "dispatcher_saturated",
            DispatchError::Closed => "dispatcher_closed",
        }
    }

    /// The key under which this error is re-routed as a fault event.
    ///
    /// Consumers registered with [`Selector::faults`](crate::Selector::faults)
    /// receive every fault; the label keeps distinct failure kinds apart.
    pub fn fault_key(&self) -> Key {
        Key::Fault(self.as_label())
    }

    /// Indicates whether retrying the dispatch could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::Saturated { .. })
    }
}
