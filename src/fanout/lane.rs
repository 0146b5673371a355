//! # Sub-stream publisher: one lane of a parallel fan-out.
//!
//! A [`SubStream`] owns a dedicated dispatcher and feeds one downstream
//! subscriber. Termination signals go through the same dispatcher as
//! elements, so an error or completion never overtakes in-flight deliveries
//! on its lane.
//!
//! ## Rules
//! - One subscriber per lane; a second `subscribe` is rejected with a warning.
//! - Demand accumulates up to the configured per-lane capacity.
//! - `request` also notifies the parent action, which forwards the demand
//!   upstream to refill the lane.
//! - `cancel` clears the parent's lane slot; the lane never comes back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::dispatch::{Dispatch, DispatcherRef};
use crate::error::DispatchError;
use crate::fanout::action::MasterInner;
use crate::fanout::{Subscriber, Subscription};

pub(crate) struct LaneShared<T> {
    index: usize,
    pool_size: usize,
    dispatcher: DispatcherRef,
    demand: AtomicU64,
    capacity: AtomicU64,
    subscriber: RwLock<Option<Arc<dyn Subscriber<T>>>>,
    parent: Weak<MasterInner<T>>,
}

/// One of the N parallel publishers owned by a fan-out action.
pub struct SubStream<T> {
    shared: Arc<LaneShared<T>>,
}

impl<T> Clone for SubStream<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> SubStream<T> {
    pub(crate) fn new(
        index: usize,
        pool_size: usize,
        dispatcher: DispatcherRef,
        parent: Weak<MasterInner<T>>,
    ) -> Self {
        Self {
            shared: Arc::new(LaneShared {
                index,
                pool_size,
                dispatcher,
                demand: AtomicU64::new(0),
                capacity: AtomicU64::new(u64::MAX),
                subscriber: RwLock::new(None),
                parent,
            }),
        }
    }

    /// Attaches the lane's single subscriber and hands it the subscription.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        {
            let mut slot = self
                .shared
                .subscriber
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if slot.is_some() {
                tracing::warn!(lane = %self.label(), "subscription rejected: lane already has a subscriber");
                return;
            }
            *slot = Some(Arc::clone(&subscriber));
        }
        subscriber.on_subscribe(Arc::new(LaneSubscription {
            shared: Arc::clone(&self.shared),
        }));
    }

    /// Zero-based position of this lane in its pool.
    pub fn index(&self) -> usize {
        self.shared.index
    }

    /// Outstanding downstream demand.
    pub fn demand(&self) -> u64 {
        self.shared.demand.load(Ordering::Acquire)
    }

    /// Configured per-lane capacity ceiling.
    pub fn capacity(&self) -> u64 {
        self.shared.capacity.load(Ordering::Acquire)
    }

    pub(crate) fn set_capacity(&self, capacity: u64) {
        self.shared.capacity.store(capacity, Ordering::Release);
        let _ = self
            .shared
            .demand
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |d| {
                Some(d.min(capacity))
            });
    }

    pub(crate) fn has_capacity(&self) -> bool {
        self.current_subscriber().is_some() && self.demand() > 0
    }

    /// Enqueues one element on the lane dispatcher, consuming one unit of
    /// demand (saturating; fallback deliveries may arrive at zero demand).
    pub(crate) fn broadcast_next(&self, element: T) -> Result<(), DispatchError> {
        let Some(subscriber) = self.current_subscriber() else {
            return Err(DispatchError::Closed);
        };
        let _ = self
            .shared
            .demand
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |d| {
                Some(d.saturating_sub(1))
            });
        self.shared
            .dispatcher
            .dispatch(Box::new(move || subscriber.on_next(element)))
    }

    /// Enqueues an error signal behind any in-flight elements.
    pub(crate) fn broadcast_error(&self, error: DispatchError) {
        let Some(subscriber) = self.current_subscriber() else {
            tracing::debug!(lane = %self.label(), "error signal dropped: no subscriber");
            return;
        };
        let _ = self
            .shared
            .dispatcher
            .dispatch(Box::new(move || subscriber.on_error(error)));
    }

    /// Enqueues a completion signal behind any in-flight elements.
    pub(crate) fn broadcast_complete(&self) {
        let Some(subscriber) = self.current_subscriber() else {
            return;
        };
        let _ = self
            .shared
            .dispatcher
            .dispatch(Box::new(move || subscriber.on_complete()));
    }

    fn current_subscriber(&self) -> Option<Arc<dyn Subscriber<T>>> {
        self.shared
            .subscriber
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn label(&self) -> String {
        format!("{}/{}", self.shared.index + 1, self.shared.pool_size)
    }
}

struct LaneSubscription<T> {
    shared: Arc<LaneShared<T>>,
}

impl<T: Send + 'static> Subscription for LaneSubscription<T> {
    fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        let capacity = self.shared.capacity.load(Ordering::Acquire);
        let _ = self
            .shared
            .demand
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |d| {
                Some(d.saturating_add(n).min(capacity))
            });
        if let Some(parent) = self.shared.parent.upgrade() {
            parent.on_request(n);
        }
    }

    fn cancel(&self) {
        self.shared
            .subscriber
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(parent) = self.shared.parent.upgrade() {
            parent.clear_lane(self.shared.index);
        }
    }
}
