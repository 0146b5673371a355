pub mod registration;
pub mod registry;
pub mod selector;

pub use registration::Registration;
pub use registry::Registry;
pub use selector::{HeaderResolver, Selector};
