use std::sync::Arc;

use crate::error::DispatchError;

/// Demand handle given to a subscriber at subscription time.
pub trait Subscription: Send + Sync {
    /// Grants the publisher permission to deliver `n` more elements.
    fn request(&self, n: u64);

    /// Stops delivery permanently.
    fn cancel(&self);
}

/// Receiver side of a stream of `E` elements.
///
/// Lanes publish their element type; the fan-out master publishes its lanes,
/// one [`SubStream`](crate::SubStream) per request, then completes.
pub trait Subscriber<E>: Send + Sync {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        let _ = subscription;
    }

    fn on_next(&self, element: E);

    fn on_error(&self, error: DispatchError) {
        let _ = error;
    }

    fn on_complete(&self) {}
}
