pub mod bus;
pub mod observable;
pub mod sinks;

mod reply;

pub use bus::{BusParts, EventBus};
pub use observable::{Observable, ObservableRef, ReplyFn};
pub use sinks::{BatchSink, PreparedSink};

pub(crate) use reply::ReplyToConsumer;
