pub mod dispatcher;
pub mod queue;
pub mod sync;

pub use dispatcher::{Dispatch, DispatcherRef, Job};
pub use queue::QueueDispatcher;
pub use sync::SyncDispatcher;
