//! # Router: delivers one event to a list of registrations.
//!
//! [`FilteringRouter`] narrows candidates through a [`Filter`], then invokes
//! each survivor in order via an [`Invoke`] implementation.
//!
//! ## Rules
//! - Survivor order is the filter's output order, which preserves the
//!   registry's insertion-order snapshot.
//! - Cancelled and paused registrations are skipped at the last moment,
//!   bounding the cancel race to tasks already dispatched.
//! - A failed invocation goes to the error sink (router-level, else the
//!   event's own hook) and routing continues: one consumer failing never
//!   starves its siblings. With no sink at all the failure is logged and
//!   returned, aborting the remaining survivors.
//! - A consumer returning [`Invocation::Cancel`] is unregistered, not failed.
//! - The completion hook runs once after the survivors, its failure reported
//!   to the sink or logged, never escalated.

use std::sync::Arc;

use crate::consumers::Invocation;
use crate::error::{DispatchError, ErrorHook};
use crate::events::{Event, Key};
use crate::registry::Registration;
use crate::routing::{ConvertingInvoker, Filter, Invoke, InvokerRef, PassThroughFilter};

/// Hook invoked with the event after routing finished.
pub type CompletionHook = Arc<dyn Fn(&Event) -> Result<(), DispatchError> + Send + Sync>;

/// Delivers one event to a candidate registration list.
pub trait Route: Send + Sync {
    /// Routes `event` under `key` to `registrations`.
    ///
    /// # Errors
    /// Returns the first consumer failure that had no error sink to go to.
    fn route(
        &self,
        key: &Key,
        event: &mut Event,
        registrations: Vec<Registration>,
        completion: Option<&CompletionHook>,
        errors: Option<&ErrorHook>,
    ) -> Result<(), DispatchError>;
}

/// Shared handle to a router.
pub type RouterRef = Arc<dyn Route>;

/// Router that filters candidates before invoking them.
pub struct FilteringRouter {
    filter: Arc<dyn Filter>,
    invoker: InvokerRef,
}

impl FilteringRouter {
    pub fn new(filter: Arc<dyn Filter>, invoker: InvokerRef) -> Self {
        Self { filter, invoker }
    }
}

impl Default for FilteringRouter {
    fn default() -> Self {
        Self::new(Arc::new(PassThroughFilter), Arc::new(ConvertingInvoker))
    }
}

impl Route for FilteringRouter {
    fn route(
        &self,
        key: &Key,
        event: &mut Event,
        registrations: Vec<Registration>,
        completion: Option<&CompletionHook>,
        errors: Option<&ErrorHook>,
    ) -> Result<(), DispatchError> {
        if !registrations.is_empty() {
            let survivors = self.filter.filter(registrations, key);
            for reg in &survivors {
                if reg.is_cancelled() || reg.is_paused() {
                    continue;
                }
                if let Some(resolver) = reg.selector().resolver() {
                    event.headers_mut().set_all(resolver(key));
                }
                match self.invoker.invoke(reg.consumer().as_ref(), event) {
                    Invocation::Handled => {}
                    Invocation::Cancel => reg.cancel(),
                    Invocation::Failed(error) => {
                        if let Some(sink) = errors {
                            sink(error);
                        } else if let Some(hook) = event.error_hook() {
                            hook(error);
                        } else {
                            tracing::error!(%key, error = %error, "event routing failed");
                            if reg.is_cancel_after_use() {
                                reg.cancel();
                            }
                            return Err(error);
                        }
                    }
                }
                if reg.is_cancel_after_use() {
                    reg.cancel();
                }
            }
        }

        if let Some(done) = completion {
            if let Err(error) = done(event) {
                match errors {
                    Some(sink) => sink(error),
                    None => tracing::error!(%key, error = %error, "completion hook failed"),
                }
            }
        }
        Ok(())
    }
}
