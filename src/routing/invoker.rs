use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::consumers::{Consume, Invocation};
use crate::dispatch::queue::panic_reason;
use crate::error::DispatchError;
use crate::events::Event;

/// Applies one consumer to one event.
pub trait Invoke: Send + Sync {
    fn invoke(&self, consumer: &dyn Consume, event: &mut Event) -> Invocation;
}

/// Shared handle to an invoker.
pub type InvokerRef = Arc<dyn Invoke>;

/// The default invoker: isolates panics at the invocation boundary.
///
/// A panicking consumer becomes [`Invocation::Failed`] with
/// [`DispatchError::Panicked`], so routing continues to the remaining
/// survivors. Payload coercion itself lives in the typed consumer adapters
/// ([`ConsumerFn::typed`](crate::ConsumerFn::typed)), which report a mismatch
/// as a failed invocation.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConvertingInvoker;

impl Invoke for ConvertingInvoker {
    fn invoke(&self, consumer: &dyn Consume, event: &mut Event) -> Invocation {
        match panic::catch_unwind(AssertUnwindSafe(|| consumer.accept(event))) {
            Ok(outcome) => outcome,
            Err(payload) => Invocation::Failed(DispatchError::Panicked {
                reason: panic_reason(payload.as_ref()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumers::ConsumerFn;

    #[test]
    fn panic_becomes_failed_invocation() {
        let consumer = ConsumerFn::arc(|_| panic!("kaput"));
        let outcome = ConvertingInvoker.invoke(consumer.as_ref(), &mut Event::empty());
        match outcome {
            Invocation::Failed(DispatchError::Panicked { reason }) => {
                assert_eq!(reason, "kaput");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn outcome_passes_through() {
        let consumer = ConsumerFn::from_outcome(|_| Invocation::Cancel);
        assert!(matches!(
            ConvertingInvoker.invoke(consumer.as_ref(), &mut Event::empty()),
            Invocation::Cancel
        ));
    }
}
