//! # Dispatcher contract.
//!
//! A dispatcher schedules opaque jobs on some execution context. The bus uses
//! one to run routing off the caller's thread; every fan-out lane owns its
//! own, so termination signals queue behind in-flight elements.
//!
//! ## Rules
//! - `dispatch` must be safe to call from any thread.
//! - `dispatch` returns after enqueue, not after execution.
//! - An `Err` means the job was **not** accepted (queue full or worker gone);
//!   callers surface it on their error path.

use std::sync::Arc;

use crate::error::DispatchError;

/// A unit of work accepted by a dispatcher.
pub type Job = Box<dyn FnOnce() + Send>;

/// Schedules jobs on some execution context.
pub trait Dispatch: Send + Sync {
    /// Enqueues a job for execution.
    fn dispatch(&self, job: Job) -> Result<(), DispatchError>;
}

/// Shared handle to a dispatcher.
pub type DispatcherRef = Arc<dyn Dispatch>;
