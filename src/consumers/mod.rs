pub mod consumer;

pub use consumer::{Consume, ConsumerFn, ConsumerRef, Invocation};
