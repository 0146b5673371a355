pub mod action;
pub mod lane;
pub mod subscriber;

pub use action::{ParallelFanOut, RESERVED_SLOTS};
pub use lane::SubStream;
pub use subscriber::{Subscriber, Subscription};
