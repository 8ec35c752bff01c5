use super::{EventProcessorRef, ProcessorName};
use std::sync::Arc;

pub type ProcessorRegistryRef = Arc<dyn ProcessorRegistry>;

/// Owns the event processors of an application and resolves them by name. Lookups must be safe to
/// call from any thread and report an unknown name as `None`.
pub trait ProcessorRegistry: 'static + Send + Sync {
    fn find(&self, name: &str) -> Option<EventProcessorRef>;

    fn processor_names(&self) -> Vec<ProcessorName>;
}
