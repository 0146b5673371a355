//! # Hot sinks returned by `prepare` and `batch`.
//!
//! Both are consumers a producer can hold on to:
//!
//! - [`PreparedSink`] dispatches each event to a fixed candidate snapshot,
//!   one task per registration (or re-selects per event in its live form).
//! - [`BatchSink`] dispatches a whole batch as a single task, routing each
//!   event in turn and firing a completion hook once at the end.

use crate::bus::EventBus;
use crate::consumers::{Consume, Invocation};
use crate::events::{Event, Key};
use crate::registry::Registration;
use crate::routing::{CompletionHook, ConvertingInvoker, Invoke, Route};

enum Candidates {
    /// Bound at `prepare` time; later registrations are ignored.
    Snapshot(Vec<Registration>),
    /// Re-selected from the registry on every event.
    Live,
}

/// Hot consumer bound to one key.
pub struct PreparedSink {
    bus: EventBus,
    key: Key,
    candidates: Candidates,
}

impl PreparedSink {
    pub(crate) fn snapshot(bus: EventBus, key: Key) -> Self {
        let candidates = Candidates::Snapshot(bus.registry_handle().select(&key));
        Self {
            bus,
            key,
            candidates,
        }
    }

    pub(crate) fn live(bus: EventBus, key: Key) -> Self {
        Self {
            bus,
            key,
            candidates: Candidates::Live,
        }
    }

    /// Dispatches one event to the bound candidates.
    pub fn accept(&self, event: Event) {
        match &self.candidates {
            Candidates::Live => self.bus.notify(self.key.clone(), event),
            Candidates::Snapshot(registrations) => {
                for reg in registrations {
                    let mut ev = event.clone().with_key(self.key.clone());
                    let reg = reg.clone();
                    let errors = self.bus.error_hook();
                    self.bus.dispatch(Box::new(move || {
                        if reg.is_cancelled() || reg.is_paused() {
                            return;
                        }
                        match ConvertingInvoker.invoke(reg.consumer().as_ref(), &mut ev) {
                            Invocation::Handled => {}
                            Invocation::Cancel => reg.cancel(),
                            Invocation::Failed(error) => errors(error),
                        }
                        if reg.is_cancel_after_use() {
                            reg.cancel();
                        }
                    }));
                }
            }
        }
    }
}

impl Consume for PreparedSink {
    fn accept(&self, event: &mut Event) -> Invocation {
        PreparedSink::accept(self, event.clone());
        Invocation::Handled
    }
}

/// Consumer of event batches; the whole batch routes inside one task.
pub struct BatchSink {
    bus: EventBus,
    key: Key,
    completion: Option<CompletionHook>,
}

impl BatchSink {
    pub(crate) fn new(bus: EventBus, key: Key, completion: Option<CompletionHook>) -> Self {
        Self {
            bus,
            key,
            completion,
        }
    }

    /// Dispatches the batch. Candidates are selected once inside the task;
    /// every event routes to every selected registration, then the completion
    /// hook fires exactly once.
    pub fn accept(&self, events: Vec<Event>) {
        let key = self.key.clone();
        let registry = self.bus.registry_handle();
        let router = self.bus.router_ref();
        let errors = self.bus.error_hook();
        let completion = self.completion.clone();

        self.bus.dispatch(Box::new(move || {
            let candidates = registry.select(&key);
            for mut event in events {
                event.set_key(key.clone());
                let _ = router.route(&key, &mut event, candidates.clone(), None, Some(&errors));
            }
            if let Some(done) = completion {
                if let Err(error) = done(&Event::empty().with_key(key.clone())) {
                    errors(error);
                }
            }
        }));
    }
}
