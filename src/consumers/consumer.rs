//! # Consumer trait and closure adapters.
//!
//! [`Consume`] is the extension point for anything that handles events.
//! Consumers report an explicit [`Invocation`] outcome instead of signalling
//! through errors:
//!
//! - [`Invocation::Handled`]: the event was processed.
//! - [`Invocation::Cancel`]: the consumer asks to be unregistered; the
//!   router cancels the registration and moves on.
//! - [`Invocation::Failed`]: a real failure, routed to the active error sink.
//!
//! [`ConsumerFn`] adapts plain closures; [`ConsumerFn::typed`] adds payload
//! downcasting so handlers can take their concrete type directly.

use std::any::{type_name, Any};
use std::sync::Arc;

use crate::error::DispatchError;
use crate::events::Event;

/// Outcome of applying one consumer to one event.
#[derive(Debug, Clone)]
pub enum Invocation {
    /// The event was handled.
    Handled,
    /// The consumer requests its own cancellation. Not a failure.
    Cancel,
    /// The consumer failed; the error travels to the error sink.
    Failed(DispatchError),
}

/// An event handler registered on the bus.
pub trait Consume: Send + Sync {
    /// Processes a single event.
    ///
    /// The event is mutable: consumers may re-key it or append headers, and
    /// consumers later in the same dispatch observe those changes.
    fn accept(&self, event: &mut Event) -> Invocation;
}

/// Shared handle to a consumer.
pub type ConsumerRef = Arc<dyn Consume>;

/// Closure adapter implementing [`Consume`].
pub struct ConsumerFn {
    inner: Box<dyn Fn(&mut Event) -> Invocation + Send + Sync>,
}

impl ConsumerFn {
    /// Wraps an infallible closure.
    pub fn arc(f: impl Fn(&mut Event) + Send + Sync + 'static) -> ConsumerRef {
        Arc::new(Self {
            inner: Box::new(move |ev| {
                f(ev);
                Invocation::Handled
            }),
        })
    }

    /// Wraps a closure that reports its own [`Invocation`] outcome.
    pub fn from_outcome(f: impl Fn(&mut Event) -> Invocation + Send + Sync + 'static) -> ConsumerRef {
        Arc::new(Self { inner: Box::new(f) })
    }

    /// Wraps a closure over a concrete payload type.
    ///
    /// The payload is downcast before the closure runs; a mismatch fails the
    /// invocation with [`DispatchError::PayloadMismatch`].
    pub fn typed<T, F>(f: F) -> ConsumerRef
    where
        T: Any + Send + Sync,
        F: Fn(&T) + Send + Sync + 'static,
    {
        Arc::new(Self {
            inner: Box::new(move |ev| match ev.data_as::<T>() {
                Some(data) => {
                    f(data);
                    Invocation::Handled
                }
                None => Invocation::Failed(DispatchError::PayloadMismatch {
                    expected: type_name::<T>(),
                }),
            }),
        })
    }
}

impl Consume for ConsumerFn {
    fn accept(&self, event: &mut Event) -> Invocation {
        (self.inner)(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_consumer_rejects_foreign_payloads() {
        let seen = Arc::new(std::sync::Mutex::new(0u32));
        let seen_in = Arc::clone(&seen);
        let consumer = ConsumerFn::typed::<u32, _>(move |n| {
            *seen_in.lock().unwrap() += n;
        });

        let mut ok = Event::wrap(7u32);
        assert!(matches!(consumer.accept(&mut ok), Invocation::Handled));
        assert_eq!(*seen.lock().unwrap(), 7);

        let mut bad = Event::wrap(String::from("nope"));
        assert!(matches!(
            consumer.accept(&mut bad),
            Invocation::Failed(DispatchError::PayloadMismatch { .. })
        ));
    }
}
