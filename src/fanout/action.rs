//! # Parallel fan-out action.
//!
//! [`ParallelFanOut`] splits one logical stream into a fixed pool of lanes,
//! each a [`SubStream`] backed by its own dispatcher.
//!
//! ## Architecture
//! ```text
//! upstream ──► on_next(element)
//!                  │ round-robin probe, bounded by per-lane demand
//!                  ├──► lane 1 [dispatcher] ──► subscriber 1
//!                  ├──► lane 2 [dispatcher] ──► subscriber 2
//!                  └──► lane N [dispatcher] ──► subscriber N
//!
//! downstream ──► subscribe() ──► receives the lanes themselves as elements
//! ```
//!
//! ## Rules
//! - An element goes to the first probed lane with a live subscription and
//!   demand left; the probe starts where the last delivery settled.
//! - With every lane exhausted, the element still goes to the last existing
//!   lane: no silent drop while any lane lives. Its dispatcher queue absorbs
//!   the overflow, which is deliberately weaker than strict backpressure.
//! - Only when every lane slot is empty (all downstreams cancelled) is the
//!   element dropped.
//! - Lane cancellation empties the slot permanently.
//! - `on_error` / `on_complete` reach the master's downstream first, then
//!   broadcast to every lane through the lane dispatchers.
//!
//! `on_next` callers must be serialized (one upstream feeding the action);
//! the master state lock enforces memory safety either way, and lane
//! cancellation from other threads is visible at the next probe.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use crate::dispatch::DispatcherRef;
use crate::error::DispatchError;
use crate::fanout::{SubStream, Subscriber, Subscription};

/// Demand reserved per lane so a lane dispatcher is never overrun by the
/// master's own buffering.
pub const RESERVED_SLOTS: u64 = 32;

struct MasterState<T> {
    lanes: Vec<Option<SubStream<T>>>,
    round_robin: usize,
    cursor: usize,
    downstream: Option<Arc<dyn Subscriber<SubStream<T>>>>,
}

pub(crate) struct MasterInner<T> {
    pool_size: usize,
    capacity: AtomicU64,
    requested: AtomicU64,
    upstream: RwLock<Option<Arc<dyn Subscription>>>,
    state: Mutex<MasterState<T>>,
}

/// Splits an element stream across a fixed pool of dispatcher-backed lanes.
pub struct ParallelFanOut<T> {
    inner: Arc<MasterInner<T>>,
}

impl<T> Clone for ParallelFanOut<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> ParallelFanOut<T> {
    /// Creates the action with `pool_size` lanes, each wrapping a dispatcher
    /// obtained from `dispatchers`.
    ///
    /// # Panics
    /// Panics when `pool_size` is zero.
    pub fn new(pool_size: usize, mut dispatchers: impl FnMut() -> DispatcherRef) -> Self {
        assert!(pool_size > 0, "pool size must be strictly positive");
        let inner = Arc::new_cyclic(|weak: &Weak<MasterInner<T>>| {
            let lanes = (0..pool_size)
                .map(|index| {
                    Some(SubStream::new(
                        index,
                        pool_size,
                        dispatchers(),
                        Weak::clone(weak),
                    ))
                })
                .collect();
            MasterInner {
                pool_size,
                capacity: AtomicU64::new(u64::MAX),
                requested: AtomicU64::new(0),
                upstream: RwLock::new(None),
                state: Mutex::new(MasterState {
                    lanes,
                    round_robin: 0,
                    cursor: 0,
                    downstream: None,
                }),
            }
        });
        Self { inner }
    }

    pub fn pool_size(&self) -> usize {
        self.inner.pool_size
    }

    /// Effective master capacity after the reservation guard.
    pub fn capacity(&self) -> u64 {
        self.inner.capacity.load(Ordering::Acquire)
    }

    /// Total demand lanes have signalled, available for upstream pull.
    pub fn requested(&self) -> u64 {
        self.inner.requested.load(Ordering::Acquire)
    }

    /// Applies the aggregate capacity policy.
    ///
    /// `pool_size * RESERVED_SLOTS` guard slots are carved out of `elements`
    /// for the master; each lane's ceiling becomes `elements / pool_size`.
    /// Degenerate budgets fall back with a diagnostic: a budget below the
    /// guard leaves the master at the requested value, and a per-lane share
    /// of zero gives every lane the full budget.
    pub fn set_capacity(&self, elements: u64) {
        let pool = self.inner.pool_size as u64;
        let guard = pool * RESERVED_SLOTS;
        if elements < guard {
            tracing::warn!(
                elements,
                guard,
                "aggregate capacity below the reservation guard; master capacity left as requested"
            );
            self.inner.capacity.store(elements, Ordering::Release);
        } else {
            self.inner
                .capacity
                .store(elements - guard + RESERVED_SLOTS, Ordering::Release);
        }

        let mut per_lane = elements / pool;
        if per_lane == 0 {
            tracing::warn!(
                pool_size = self.inner.pool_size,
                elements,
                "per-lane share rounds to zero; every lane shares the full budget"
            );
            per_lane = elements;
        }

        let state = self.inner.lock_state();
        for lane in state.lanes.iter().flatten() {
            lane.set_capacity(per_lane);
        }
    }

    /// Subscribes the downstream that receives the lanes themselves.
    ///
    /// Each `request(r)` emits up to `r` not-yet-emitted lanes as elements;
    /// once all `pool_size` lanes are out, the stream completes.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<SubStream<T>>>) {
        {
            let mut state = self.inner.lock_state();
            state.downstream = Some(Arc::clone(&subscriber));
        }
        subscriber.on_subscribe(Arc::new(MasterSubscription {
            inner: Arc::downgrade(&self.inner),
        }));
    }

    /// Current lane handles; empty slots are cancelled lanes.
    pub fn lanes(&self) -> Vec<Option<SubStream<T>>> {
        self.inner.lock_state().lanes.clone()
    }
}

/// The action is the subscriber side of its upstream: elements arrive through
/// `on_next`, termination through `on_error` / `on_complete`.
impl<T: Send + 'static> Subscriber<T> for ParallelFanOut<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        *self
            .inner
            .upstream
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);
    }

    fn on_next(&self, element: T) {
        self.inner.do_next(element);
    }

    fn on_error(&self, error: DispatchError) {
        self.inner.do_error(error);
    }

    fn on_complete(&self) {
        self.inner.do_complete();
    }
}

impl<T: Send + 'static> MasterInner<T> {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, MasterState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Probes up to `pool_size` lanes from the round-robin cursor. The first
    /// lane with a subscription and demand wins and the cursor stays on it;
    /// skipped lanes advance the cursor. With no demand anywhere, the last
    /// existing lane takes the element regardless.
    fn do_next(&self, element: T) {
        let mut target: Option<SubStream<T>> = None;
        let mut last_existing: Option<SubStream<T>> = None;
        {
            let mut state = self.lock_state();
            let mut tries = 0;
            while tries < self.pool_size {
                if let Some(lane) = state.lanes[state.round_robin].as_ref() {
                    last_existing = Some(lane.clone());
                    if lane.has_capacity() {
                        target = Some(lane.clone());
                        break;
                    }
                }
                state.round_robin = (state.round_robin + 1) % self.pool_size;
                tries += 1;
            }
        }

        match target.or(last_existing) {
            Some(lane) => {
                if let Err(error) = lane.broadcast_next(element) {
                    lane.broadcast_error(error);
                }
            }
            None => tracing::debug!("element dropped: every downstream lane is cancelled"),
        }
    }

    fn do_error(&self, error: DispatchError) {
        let (downstream, lanes) = self.terminal_targets();
        if let Some(subscriber) = downstream {
            subscriber.on_error(error.clone());
        }
        for lane in lanes {
            lane.broadcast_error(error.clone());
        }
    }

    fn do_complete(&self) {
        let (downstream, lanes) = self.terminal_targets();
        if let Some(subscriber) = downstream {
            subscriber.on_complete();
        }
        for lane in lanes {
            lane.broadcast_complete();
        }
    }

    fn terminal_targets(
        &self,
    ) -> (
        Option<Arc<dyn Subscriber<SubStream<T>>>>,
        Vec<SubStream<T>>,
    ) {
        let state = self.lock_state();
        (
            state.downstream.clone(),
            state.lanes.iter().flatten().cloned().collect(),
        )
    }

    /// A lane signalled demand: record it and pull from upstream.
    pub(crate) fn on_request(&self, n: u64) {
        self.requested.fetch_add(n, Ordering::AcqRel);
        let upstream = self
            .upstream
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(subscription) = upstream {
            subscription.request(n);
        }
    }

    /// A lane's downstream cancelled: empty the slot for good.
    pub(crate) fn clear_lane(&self, index: usize) {
        self.lock_state().lanes[index] = None;
    }
}

struct MasterSubscription<T> {
    inner: Weak<MasterInner<T>>,
}

impl<T: Send + 'static> Subscription for MasterSubscription<T> {
    fn request(&self, n: u64) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let (downstream, handles, completed) = {
            let mut state = inner.lock_state();
            let Some(downstream) = state.downstream.clone() else {
                return;
            };
            let start = state.cursor;
            let end = start.saturating_add(n as usize).min(inner.pool_size);
            let handles: Vec<SubStream<T>> =
                state.lanes[start..end].iter().flatten().cloned().collect();
            state.cursor = end;
            (downstream, handles, end == inner.pool_size && start < end)
        };

        for lane in handles {
            downstream.on_next(lane);
        }
        if completed {
            downstream.on_complete();
        }
    }

    fn cancel(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.lock_state().downstream = None;
        }
    }
}
