//! # Events carried through the bus.
//!
//! An [`Event`] is what producers hand to the bus and what consumers receive:
//! an opaque payload plus routing metadata.
//!
//! - `key` is set by the bus at dispatch time ([`notify`](crate::EventBus::notify)).
//! - `headers` is an ordered string multimap; selector header resolvers append
//!   to it during routing.
//! - `reply_to` designates the key a response should be published under.
//! - `reply_observable` pins the gateway replies go through; it is only set by
//!   [`send`](crate::EventBus::send) and friends.
//!
//! Payloads are `Arc`-shared [`Any`] values, so events clone cheaply and a
//! single bus can carry mixed payload types. Typed consumers downcast via
//! [`Event::data_as`].

use std::any::Any;
use std::sync::Arc;

use crate::bus::ObservableRef;
use crate::error::{DispatchError, ErrorHook};
use crate::events::Key;

/// Shared, type-erased event payload.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Ordered string multimap attached to every event.
///
/// Later entries for the same name shadow earlier ones for [`Headers::get`];
/// [`Headers::all`] exposes every value in insertion order.
#[derive(Clone, Debug, Default)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value recorded for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value recorded for `name`, in insertion order.
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Appends a value without touching existing entries for the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces every entry for `name` with a single value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.entries.retain(|(k, _)| *k != name);
        self.entries.push((name, value.into()));
    }

    /// Applies [`Headers::set`] for every pair.
    pub fn set_all(&mut self, pairs: impl IntoIterator<Item = (String, String)>) {
        for (name, value) in pairs {
            self.set(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A routable event: payload plus dispatch metadata.
#[derive(Clone)]
pub struct Event {
    key: Option<Key>,
    headers: Headers,
    data: Payload,
    reply_to: Option<Key>,
    reply_observable: Option<ObservableRef>,
    error_hook: Option<ErrorHook>,
}

impl Event {
    /// Wraps a payload value into an event with no routing metadata yet.
    pub fn wrap<T: Any + Send + Sync>(data: T) -> Self {
        Self {
            key: None,
            headers: Headers::new(),
            data: Arc::new(data),
            reply_to: None,
            reply_observable: None,
            error_hook: None,
        }
    }

    /// An event with a unit payload, for key-only notifications.
    pub fn empty() -> Self {
        Self::wrap(())
    }

    /// Wraps a dispatch error so it can travel the bus as a fault event.
    pub fn from_error(error: DispatchError) -> Self {
        Self::wrap(error)
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// Sets the routing key. Consumers may re-key an event mid-dispatch;
    /// later consumers in the same dispatch observe the new key.
    pub fn set_key(&mut self, key: impl Into<Key>) {
        self.key = Some(key.into());
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn data(&self) -> &Payload {
        &self.data
    }

    /// Downcasts the payload.
    pub fn data_as<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    pub fn reply_to(&self) -> Option<&Key> {
        self.reply_to.as_ref()
    }

    pub fn set_reply_to(&mut self, key: Key) {
        self.reply_to = Some(key);
    }

    pub fn reply_observable(&self) -> Option<&ObservableRef> {
        self.reply_observable.as_ref()
    }

    pub fn error_hook(&self) -> Option<&ErrorHook> {
        self.error_hook.as_ref()
    }

    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    pub fn with_reply_to(mut self, key: Key) -> Self {
        self.reply_to = Some(key);
        self
    }

    /// Attaches a per-event error sink, consulted when no router-level sink
    /// is present.
    pub fn with_error_hook(mut self, hook: ErrorHook) -> Self {
        self.error_hook = Some(hook);
        self
    }

    pub(crate) fn with_reply_observable(mut self, observable: ObservableRef) -> Self {
        self.reply_observable = Some(observable);
        self
    }
}
