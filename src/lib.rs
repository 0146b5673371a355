//! # eventgate
//!
//! **Eventgate** is a reactive event-dispatch runtime: an in-process library
//! for routing discrete events from producers to subscribers asynchronously,
//! with demand-based backpressure where it matters.
//!
//! ## Features
//!
//! | Area            | Description                                                              | Key types / traits                             |
//! |-----------------|--------------------------------------------------------------------------|------------------------------------------------|
//! | **Event bus**   | Keyed publish/subscribe gateway with reply-to semantics.                 | [`EventBus`], [`Observable`], [`Selector`]     |
//! | **Routing**     | Pluggable filter → invoke pipeline with per-dispatch error isolation.    | [`Route`], [`Filter`], [`Invoke`]              |
//! | **Consumers**   | Event handlers with explicit outcomes and typed payload access.          | [`Consume`], [`ConsumerFn`], [`Invocation`]    |
//! | **Dispatchers** | Pluggable execution contexts: inline or queue-backed worker.             | [`Dispatch`], [`SyncDispatcher`], [`QueueDispatcher`] |
//! | **Fan-out**     | Splits one stream across a pool of dispatcher-backed lanes, demand-aware.| [`ParallelFanOut`], [`SubStream`], [`Subscriber`] |
//! | **Errors**      | Typed dispatch failures, re-routable as ordinary events.                 | [`DispatchError`]                              |
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use eventgate::{ConsumerFn, Event, EventBus, Selector};
//!
//! let bus = EventBus::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&seen);
//! bus.on(
//!     Selector::key("greetings"),
//!     ConsumerFn::typed::<String, _>(move |text| sink.lock().unwrap().push(text.clone())),
//! );
//!
//! bus.notify("greetings", Event::wrap(String::from("hello")));
//! assert_eq!(*seen.lock().unwrap(), vec![String::from("hello")]);
//! ```
//!
//! ---

mod bus;
mod consumers;
mod dispatch;
mod error;
mod events;
mod fanout;
mod registry;
mod routing;

// ---- Public re-exports ----

pub use bus::{BatchSink, BusParts, EventBus, Observable, ObservableRef, PreparedSink, ReplyFn};
pub use consumers::{Consume, ConsumerFn, ConsumerRef, Invocation};
pub use dispatch::{Dispatch, DispatcherRef, Job, QueueDispatcher, SyncDispatcher};
pub use error::{DispatchError, ErrorHook};
pub use events::{Event, Headers, Key, KeyKind, Payload};
pub use fanout::{ParallelFanOut, SubStream, Subscriber, Subscription, RESERVED_SLOTS};
pub use registry::{HeaderResolver, Registration, Registry, Selector};
pub use routing::{
    CompletionHook, ConvertingInvoker, Filter, FilteringRouter, Invoke, InvokerRef,
    PassThroughFilter, Route, RouterRef,
};
