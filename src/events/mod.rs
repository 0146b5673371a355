pub mod event;
pub mod key;

pub use event::{Event, Headers, Payload};
pub use key::{Key, KeyKind};
