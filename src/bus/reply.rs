use crate::bus::{EventBus, Observable, ObservableRef, ReplyFn};
use crate::consumers::{Consume, Invocation};
use crate::events::Event;

/// Consumer wrapper that publishes its function's result as a reply.
///
/// The reply target is the inbound event's pinned observable when present
/// (set by `send`), otherwise the bus this consumer was registered on. An
/// error from the function is published to its fault key on the same target,
/// where error consumers can pick it up.
pub(crate) struct ReplyToConsumer {
    reply: ReplyFn,
    bus: EventBus,
}

impl ReplyToConsumer {
    pub(crate) fn new(reply: ReplyFn, bus: EventBus) -> Self {
        Self { reply, bus }
    }
}

impl Consume for ReplyToConsumer {
    fn accept(&self, event: &mut Event) -> Invocation {
        let target: ObservableRef = match event.reply_observable() {
            Some(observable) => ObservableRef::clone(observable),
            None => self.bus.as_observable(),
        };

        match (self.reply)(event) {
            Ok(reply) => match event.reply_to() {
                Some(key) => target.notify(key.clone(), reply),
                None => tracing::warn!("reply discarded: event carries no reply-to key"),
            },
            Err(error) => {
                let key = error.fault_key();
                target.notify(key, Event::from_error(error));
            }
        }
        Invocation::Handled
    }
}
