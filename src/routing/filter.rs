use crate::events::Key;
use crate::registry::Registration;

/// Narrows a candidate registration list before routing, preserving order.
pub trait Filter: Send + Sync {
    fn filter(&self, registrations: Vec<Registration>, key: &Key) -> Vec<Registration>;
}

/// The default filter: every candidate survives.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughFilter;

impl Filter for PassThroughFilter {
    fn filter(&self, registrations: Vec<Registration>, _key: &Key) -> Vec<Registration> {
        registrations
    }
}
