pub mod filter;
pub mod invoker;
pub mod router;

pub use filter::{Filter, PassThroughFilter};
pub use invoker::{ConvertingInvoker, Invoke, InvokerRef};
pub use router::{CompletionHook, FilteringRouter, Route, RouterRef};
