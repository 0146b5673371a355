//! # Selectors: key predicates that govern delivery.
//!
//! A [`Selector`] decides which keys a registration receives. Kinds:
//!
//! - [`Selector::key`]: exact key equality.
//! - [`Selector::anonymous`]: a fresh unique key, used for reply channels;
//!   [`Selector::object`] exposes the key to notify it under.
//! - [`Selector::kind`]: matches every key of one [`KeyKind`]
//!   ([`Selector::faults`] is the error-consumer shorthand).
//! - [`Selector::predicate`]: arbitrary match function.
//!
//! A selector may carry a header resolver; the router merges its output into
//! the event's headers before the consumer runs.

use std::fmt;
use std::sync::Arc;

use crate::events::{Key, KeyKind};

/// Derives extra headers from the matched key.
pub type HeaderResolver = Arc<dyn Fn(&Key) -> Vec<(String, String)> + Send + Sync>;

#[derive(Clone)]
enum MatchKind {
    Exact(Key),
    Kind(KeyKind),
    Predicate(Arc<dyn Fn(&Key) -> bool + Send + Sync>),
}

/// Predicate over routing keys, with an optional header resolver.
#[derive(Clone)]
pub struct Selector {
    kind: MatchKind,
    resolver: Option<HeaderResolver>,
}

impl Selector {
    /// Matches exactly the given key.
    pub fn key(key: impl Into<Key>) -> Self {
        Self {
            kind: MatchKind::Exact(key.into()),
            resolver: None,
        }
    }

    /// Matches a freshly minted unique key, retrievable via [`Selector::object`].
    pub fn anonymous() -> Self {
        Self::key(Key::unique())
    }

    /// Matches every key of the given kind.
    pub fn kind(kind: KeyKind) -> Self {
        Self {
            kind: MatchKind::Kind(kind),
            resolver: None,
        }
    }

    /// Matches every named key.
    pub fn names() -> Self {
        Self::kind(KeyKind::Name)
    }

    /// Matches every fault key; the registration becomes an error consumer.
    pub fn faults() -> Self {
        Self::kind(KeyKind::Fault)
    }

    /// Matches keys accepted by the predicate.
    pub fn predicate(f: impl Fn(&Key) -> bool + Send + Sync + 'static) -> Self {
        Self {
            kind: MatchKind::Predicate(Arc::new(f)),
            resolver: None,
        }
    }

    /// Attaches a header resolver.
    pub fn with_resolver(
        mut self,
        f: impl Fn(&Key) -> Vec<(String, String)> + Send + Sync + 'static,
    ) -> Self {
        self.resolver = Some(Arc::new(f));
        self
    }

    pub fn matches(&self, key: &Key) -> bool {
        match &self.kind {
            MatchKind::Exact(expected) => expected == key,
            MatchKind::Kind(kind) => key.kind() == *kind,
            MatchKind::Predicate(f) => f(key),
        }
    }

    /// The concrete key of an exact-match selector.
    ///
    /// For [`Selector::anonymous`] this is the key replies must be sent to.
    pub fn object(&self) -> Option<&Key> {
        match &self.kind {
            MatchKind::Exact(key) => Some(key),
            _ => None,
        }
    }

    pub fn resolver(&self) -> Option<&HeaderResolver> {
        self.resolver.as_ref()
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MatchKind::Exact(key) => write!(f, "Selector::key({key})"),
            MatchKind::Kind(kind) => write!(f, "Selector::kind({kind:?})"),
            MatchKind::Predicate(_) => f.write_str("Selector::predicate(..)"),
        }
    }
}
