//! # Consumer registry.
//!
//! Ordered, thread-safe table of [`Registration`]s. [`Registry::select`]
//! returns a snapshot: mutation during routing never invalidates an ongoing
//! iteration, and the snapshot reflects non-cancelled consumers at call time.
//!
//! Cancelled entries are pruned lazily on the next `select` that observes
//! them. The cached prefix-matching registry of larger deployments is an
//! external collaborator; this one trades lookups for simplicity and exact
//! insertion-order semantics.

use std::sync::{Arc, PoisonError, RwLock};

use crate::consumers::ConsumerRef;
use crate::events::Key;
use crate::registry::{Registration, Selector};

/// Thread-safe, insertion-ordered consumer table.
#[derive(Clone, Default)]
pub struct Registry {
    entries: Arc<RwLock<Vec<Registration>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a consumer to a selector and returns the live registration.
    pub fn register(&self, selector: Selector, consumer: ConsumerRef) -> Registration {
        let registration = Registration::new(selector, consumer);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(registration.clone());
        registration
    }

    /// Snapshot of registrations matching `key`, in insertion order.
    pub fn select(&self, key: &Key) -> Vec<Registration> {
        let mut saw_cancelled = false;
        let matched: Vec<Registration> = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries
                .iter()
                .filter(|reg| {
                    if reg.is_cancelled() {
                        saw_cancelled = true;
                        return false;
                    }
                    reg.selector().matches(key)
                })
                .cloned()
                .collect()
        };
        if saw_cancelled {
            self.prune();
        }
        matched
    }

    /// Number of live entries, cancelled ones included until pruned.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancels and removes every registration.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for reg in entries.iter() {
            reg.cancel();
        }
        entries.clear();
    }

    fn prune(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|reg| !reg.is_cancelled());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumers::ConsumerFn;

    #[test]
    fn select_preserves_insertion_order() {
        let registry = Registry::new();
        let a = registry.register(Selector::key("k"), ConsumerFn::arc(|_| {}));
        let b = registry.register(Selector::names(), ConsumerFn::arc(|_| {}));
        registry.register(Selector::key("other"), ConsumerFn::arc(|_| {}));

        let selected = registry.select(&Key::from("k"));
        assert_eq!(
            selected.iter().map(Registration::id).collect::<Vec<_>>(),
            vec![a.id(), b.id()]
        );
    }

    #[test]
    fn cancelled_registrations_disappear() {
        let registry = Registry::new();
        let reg = registry.register(Selector::key("k"), ConsumerFn::arc(|_| {}));
        assert_eq!(registry.select(&Key::from("k")).len(), 1);

        reg.cancel();
        assert!(registry.select(&Key::from("k")).is_empty());
        // Pruned on the select that observed the cancellation.
        assert_eq!(registry.len(), 0);
    }
}
