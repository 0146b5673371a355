use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::consumers::ConsumerRef;
use crate::registry::Selector;

/// Global sequence for registration ordering. Insertion order is the routing
/// tie-break, so ids must be monotonic.
static REGISTRATION_SEQ: AtomicU64 = AtomicU64::new(0);

struct Inner {
    id: u64,
    selector: Selector,
    consumer: ConsumerRef,
    cancelled: AtomicBool,
    paused: AtomicBool,
    cancel_after_use: AtomicBool,
    pausable: AtomicBool,
}

/// Live binding of a selector to a consumer.
///
/// Shared between the registry and any in-flight dispatch; cancellation is
/// eventually visible, and the router re-checks it right before invoking.
/// Once cancelled, a registration is never delivered again.
#[derive(Clone)]
pub struct Registration {
    inner: Arc<Inner>,
}

impl Registration {
    pub(crate) fn new(selector: Selector, consumer: ConsumerRef) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: REGISTRATION_SEQ.fetch_add(1, Ordering::Relaxed),
                selector,
                consumer,
                cancelled: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                cancel_after_use: AtomicBool::new(false),
                pausable: AtomicBool::new(true),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn selector(&self) -> &Selector {
        &self.inner.selector
    }

    pub(crate) fn consumer(&self) -> &ConsumerRef {
        &self.inner.consumer
    }

    /// Permanently removes this registration from delivery.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Marks the registration for cancellation after its next delivery.
    pub fn cancel_after_use(&self) -> &Self {
        self.inner.cancel_after_use.store(true, Ordering::Release);
        self
    }

    pub fn is_cancel_after_use(&self) -> bool {
        self.inner.cancel_after_use.load(Ordering::Acquire)
    }

    /// Suspends delivery without unregistering. No-op when not pausable.
    pub fn pause(&self) {
        if self.inner.pausable.load(Ordering::Acquire) {
            self.inner.paused.store(true, Ordering::Release);
        }
    }

    pub fn resume(&self) {
        self.inner.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::Acquire)
    }

    /// Controls whether [`pause`](Self::pause) has any effect.
    pub fn set_pausable(&self, pausable: bool) -> &Self {
        self.inner.pausable.store(pausable, Ordering::Release);
        self
    }
}
