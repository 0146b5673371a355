use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

/// Routing key attached to an event at dispatch time.
///
/// Keys are opaque to the bus; selectors decide what matches.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// A named channel.
    Name(Arc<str>),
    /// A one-off identity, used for anonymous reply channels.
    Unique(Uuid),
    /// A fault label under which errors are re-routed.
    Fault(&'static str),
}

/// Discriminant of a [`Key`], used by kind-matching selectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyKind {
    Name,
    Unique,
    Fault,
}

impl Key {
    /// Creates a fresh unique key.
    pub fn unique() -> Self {
        Key::Unique(Uuid::now_v7())
    }

    pub fn kind(&self) -> KeyKind {
        match self {
            Key::Name(_) => KeyKind::Name,
            Key::Unique(_) => KeyKind::Unique,
            Key::Fault(_) => KeyKind::Fault,
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(Arc::from(name))
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(Arc::from(name.as_str()))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => write!(f, "{name}"),
            Key::Unique(id) => write!(f, "unique:{id}"),
            Key::Fault(label) => write!(f, "fault:{label}"),
        }
    }
}
