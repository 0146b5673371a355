//! # Event bus: the keyed publish/subscribe gateway.
//!
//! [`EventBus`] accepts keyed events and forwards them to matching consumers
//! through a dispatcher/router pipeline.
//!
//! ## Architecture
//! ```text
//! notify(key, event)
//!     │  set key, enqueue
//!     ▼
//! [Dispatch] ──► task ──► Router.route(key, event, Registry.select(key))
//!                              │  filter → invoke survivors in order
//!                              └────► failures → dispatch error handler
//!                                        └────► re-routed as fault events
//! ```
//!
//! ## Rules
//! - `notify` returns after enqueue; delivery happens wherever the dispatcher
//!   runs its tasks (the default [`SyncDispatcher`] runs them inline).
//! - One consumer failing never prevents siblings from receiving the event.
//! - Failures are re-routed as events keyed by their fault label, so error
//!   consumers are ordinary registrations ([`Selector::faults`]).
//! - A bus is a cheap clonable handle; clones share registry and dispatcher.

use std::sync::{Arc, OnceLock, Weak};

use uuid::Uuid;

use crate::bus::sinks::{BatchSink, PreparedSink};
use crate::bus::{Observable, ObservableRef, ReplyFn, ReplyToConsumer};
use crate::consumers::{Consume, ConsumerFn, ConsumerRef, Invocation};
use crate::dispatch::{Dispatch, DispatcherRef, Job, SyncDispatcher};
use crate::error::{DispatchError, ErrorHook};
use crate::events::{Event, Key};
use crate::registry::{Registration, Registry, Selector};
use crate::routing::{CompletionHook, FilteringRouter, Route, RouterRef};

/// Optional pieces of a bus; anything left `None` gets the default.
///
/// Defaults: fresh [`Registry`], [`SyncDispatcher`], [`FilteringRouter`],
/// a dispatch error handler that re-routes failures as fault events, and a
/// last-resort fault consumer that logs at error level.
#[derive(Default)]
pub struct BusParts {
    pub registry: Option<Registry>,
    pub dispatcher: Option<DispatcherRef>,
    pub router: Option<RouterRef>,
    /// Receives dispatch-level failures instead of the re-routing default.
    pub dispatch_errors: Option<ErrorHook>,
    /// Invoked by the last-resort fault consumer instead of logging.
    pub uncaught: Option<ErrorHook>,
}

pub(crate) struct BusInner {
    registry: Registry,
    dispatcher: DispatcherRef,
    router: RouterRef,
    dispatch_errors: ErrorHook,
    id: OnceLock<Uuid>,
}

impl BusInner {
    /// Task body of a dispatch: route the event under its key.
    fn route_event(&self, event: &mut Event) {
        let Some(key) = event.key().cloned() else {
            tracing::warn!("event dropped: routed without a key");
            return;
        };
        let candidates = self.registry.select(&key);
        let _ = self.router.route(
            &key,
            event,
            candidates,
            None,
            Some(&self.dispatch_errors),
        );
    }
}

/// In-process event gateway. See the module docs.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// A bus with every default: synchronous dispatch, filtering router.
    pub fn new() -> Self {
        Self::assemble(BusParts::default())
    }

    /// A bus running its routing tasks on the given dispatcher.
    pub fn with_dispatcher(dispatcher: DispatcherRef) -> Self {
        Self::assemble(BusParts {
            dispatcher: Some(dispatcher),
            ..BusParts::default()
        })
    }

    /// Builds a bus from parts, filling gaps with defaults.
    pub fn assemble(parts: BusParts) -> Self {
        let registry = parts.registry.unwrap_or_default();
        let dispatcher = parts
            .dispatcher
            .unwrap_or_else(|| Arc::new(SyncDispatcher));
        let router: RouterRef = parts
            .router
            .unwrap_or_else(|| Arc::new(FilteringRouter::default()));

        let custom_errors = parts.dispatch_errors;
        let inner = Arc::new_cyclic(|weak: &Weak<BusInner>| {
            let dispatch_errors =
                custom_errors.unwrap_or_else(|| Self::rerouting_hook(weak.clone()));
            BusInner {
                registry,
                dispatcher,
                router,
                dispatch_errors,
                id: OnceLock::new(),
            }
        });

        let bus = Self { inner };
        bus.register_fault_backstop(parts.uncaught);
        bus
    }

    /// The default dispatch error handler: re-route the failure as an event
    /// keyed by its fault label, through the bus's own router.
    fn rerouting_hook(weak: Weak<BusInner>) -> ErrorHook {
        Arc::new(move |error: DispatchError| {
            let Some(inner) = weak.upgrade() else { return };
            let key = error.fault_key();
            let mut event = Event::from_error(error).with_key(key.clone());
            let candidates = inner.registry.select(&key);
            let _ = inner.router.route(&key, &mut event, candidates, None, None);
        })
    }

    /// Last-resort consumer on every fault key: hand the error to the
    /// uncaught handler, or log it.
    fn register_fault_backstop(&self, uncaught: Option<ErrorHook>) {
        self.on(
            Selector::faults(),
            ConsumerFn::arc(move |event| {
                let error = event.data_as::<DispatchError>().cloned();
                match (&uncaught, error) {
                    (Some(hook), Some(error)) => hook(error),
                    (Some(hook), None) => hook(DispatchError::Consumer {
                        reason: String::from("fault event with opaque payload"),
                    }),
                    (None, Some(error)) => {
                        tracing::error!(error = %error, "uncaught dispatch failure")
                    }
                    (None, None) => {
                        tracing::error!("uncaught dispatch failure with opaque payload")
                    }
                }
            }),
        );
    }

    /// Unique id of this bus, generated on first access.
    pub fn id(&self) -> Uuid {
        *self.inner.id.get_or_init(Uuid::now_v7)
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn dispatcher(&self) -> &DispatcherRef {
        &self.inner.dispatcher
    }

    pub fn router(&self) -> &RouterRef {
        &self.inner.router
    }

    /// This bus as a shared [`Observable`] handle.
    pub fn as_observable(&self) -> ObservableRef {
        Arc::new(self.clone())
    }

    /// Registers `consumer` for every key matching `selector`.
    pub fn on(&self, selector: Selector, consumer: ConsumerRef) -> Registration {
        self.inner.registry.register(selector, consumer)
    }

    /// Registers a reply-producing consumer; see [`ReplyFn`].
    pub fn receive(&self, selector: Selector, reply: ReplyFn) -> Registration {
        self.on(
            selector,
            Arc::new(ReplyToConsumer::new(reply, self.clone())),
        )
    }

    /// Sets the event's key and enqueues it for routing.
    ///
    /// Returns once the task is enqueued; an enqueue failure goes to the
    /// dispatch error handler.
    pub fn notify(&self, key: impl Into<Key>, mut event: Event) {
        event.set_key(key.into());
        let inner = Arc::clone(&self.inner);
        self.dispatch(Box::new(move || {
            let mut event = event;
            inner.route_event(&mut event);
        }));
    }

    /// Notifies with a lazily produced event.
    pub fn notify_with(&self, key: impl Into<Key>, supplier: impl FnOnce() -> Event) {
        self.notify(key, supplier());
    }

    /// Notifies with an empty payload; useful for pure signals.
    pub fn notify_key(&self, key: impl Into<Key>) {
        self.notify(key, Event::empty());
    }

    /// Like [`notify`](Self::notify), but replies triggered by this event are
    /// published through this bus.
    pub fn send(&self, key: impl Into<Key>, event: Event) {
        self.notify(key, event.with_reply_observable(self.as_observable()));
    }

    /// Like [`send`](Self::send), with replies pinned to `reply_to`.
    pub fn send_to(&self, key: impl Into<Key>, event: Event, reply_to: ObservableRef) {
        self.notify(key, event.with_reply_observable(reply_to));
    }

    /// Request/response round-trip.
    ///
    /// Registers `reply` on a fresh anonymous key, marks the registration
    /// single-use, then notifies `event` with its reply-to pointing at that
    /// key. The registration is cancelled after the first reply.
    pub fn send_and_receive(&self, key: impl Into<Key>, event: Event, reply: ConsumerRef) {
        let reply_key = Key::unique();
        self.on(Selector::key(reply_key.clone()), reply)
            .cancel_after_use();
        self.notify(key, event.with_reply_to(reply_key));
    }

    /// Snapshots the candidates for `key` into a hot sink.
    ///
    /// The snapshot is bound now; registrations added later are ignored. Use
    /// [`prepare_live`](Self::prepare_live) to re-select per event.
    pub fn prepare(&self, key: impl Into<Key>) -> PreparedSink {
        PreparedSink::snapshot(self.clone(), key.into())
    }

    /// A hot sink that re-selects candidates on every event.
    pub fn prepare_live(&self, key: impl Into<Key>) -> PreparedSink {
        PreparedSink::live(self.clone(), key.into())
    }

    /// A sink that routes a whole batch inside one dispatched task.
    pub fn batch(&self, key: impl Into<Key>) -> BatchSink {
        BatchSink::new(self.clone(), key.into(), None)
    }

    /// Like [`batch`](Self::batch), invoking `completion` once after the
    /// whole batch routed.
    pub fn batch_with(&self, key: impl Into<Key>, completion: CompletionHook) -> BatchSink {
        BatchSink::new(self.clone(), key.into(), Some(completion))
    }

    /// Runs an arbitrary closure on the bus's dispatcher, passing `data`.
    pub fn schedule<T, F>(&self, consumer: F, data: T)
    where
        T: Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        self.dispatch(Box::new(move || consumer(data)));
    }

    /// True when at least one non-cancelled registration matches `key`.
    pub fn responds_to(&self, key: &Key) -> bool {
        self.inner
            .registry
            .select(key)
            .iter()
            .any(|reg| !reg.is_cancelled())
    }

    pub(crate) fn dispatch(&self, job: Job) {
        if let Err(error) = self.inner.dispatcher.dispatch(job) {
            (self.inner.dispatch_errors)(error);
        }
    }

    pub(crate) fn error_hook(&self) -> ErrorHook {
        Arc::clone(&self.inner.dispatch_errors)
    }

    pub(crate) fn router_ref(&self) -> RouterRef {
        Arc::clone(&self.inner.router)
    }

    pub(crate) fn registry_handle(&self) -> Registry {
        self.inner.registry.clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// The bus is itself the consumer side of its dispatch tasks: accepting an
/// event routes it by its key.
impl Consume for EventBus {
    fn accept(&self, event: &mut Event) -> Invocation {
        self.inner.route_event(event);
        Invocation::Handled
    }
}

impl Observable for EventBus {
    fn notify(&self, key: Key, event: Event) {
        EventBus::notify(self, key, event);
    }

    fn notify_key(&self, key: Key) {
        EventBus::notify_key(self, key);
    }

    fn send(&self, key: Key, event: Event) {
        EventBus::send(self, key, event);
    }

    fn send_and_receive(&self, key: Key, event: Event, reply: ConsumerRef) {
        EventBus::send_and_receive(self, key, event, reply);
    }

    fn responds_to(&self, key: &Key) -> bool {
        EventBus::responds_to(self, key)
    }

    fn on(&self, selector: Selector, consumer: ConsumerRef) -> Registration {
        EventBus::on(self, selector, consumer)
    }

    fn receive(&self, selector: Selector, reply: ReplyFn) -> Registration {
        EventBus::receive(self, selector, reply)
    }
}
