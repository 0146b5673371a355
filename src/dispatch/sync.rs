use crate::dispatch::{Dispatch, Job};
use crate::error::DispatchError;

/// Dispatcher that runs each job inline on the caller's thread.
///
/// This is the bus default: `notify` routes before it returns, which keeps
/// single-threaded setups and tests deterministic. Panics propagate to the
/// caller; the invoker boundary has already caught consumer panics by then.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncDispatcher;

impl Dispatch for SyncDispatcher {
    fn dispatch(&self, job: Job) -> Result<(), DispatchError> {
        job();
        Ok(())
    }
}
