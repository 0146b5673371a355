use std::sync::Arc;

use crate::consumers::ConsumerRef;
use crate::error::DispatchError;
use crate::events::{Event, Key};
use crate::registry::{Registration, Selector};

/// Reply-producing function registered through [`Observable::receive`].
///
/// The returned event is published to the inbound event's reply-to key; an
/// error is published under its fault key instead.
pub type ReplyFn = Arc<dyn Fn(&mut Event) -> Result<Event, DispatchError> + Send + Sync>;

/// The capability set of an event gateway.
///
/// Implemented by [`EventBus`](crate::EventBus); events carry a handle to one
/// so replies can be pinned to the gateway that originated a `send`.
pub trait Observable: Send + Sync {
    /// Routes `event` to consumers matching `key`. Returns after enqueue.
    fn notify(&self, key: Key, event: Event);

    /// Routes an empty event under `key`.
    fn notify_key(&self, key: Key);

    /// Like [`notify`](Observable::notify), with replies pinned to this
    /// gateway.
    fn send(&self, key: Key, event: Event);

    /// Request/response round-trip: registers `reply` on a one-off channel,
    /// then notifies `event` with its reply-to pointing there.
    fn send_and_receive(&self, key: Key, event: Event, reply: ConsumerRef);

    /// True when at least one non-cancelled registration matches `key`.
    fn responds_to(&self, key: &Key) -> bool;

    /// Registers a consumer.
    fn on(&self, selector: Selector, consumer: ConsumerRef) -> Registration;

    /// Registers a reply-producing consumer.
    fn receive(&self, selector: Selector, reply: ReplyFn) -> Registration;
}

/// Shared handle to an observable gateway.
pub type ObservableRef = Arc<dyn Observable>;
