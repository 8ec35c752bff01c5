use crate::processor::{EventProcessorRef, ProcessorName, ProcessorRegistry};
use dashmap::DashMap;

/// A memory-backed lookup table of event processors. It only resolves names; running the
/// registered processors is left to their owner.
#[derive(Debug, Default)]
pub struct InMemoryProcessorRegistry {
    processors: DashMap<ProcessorName, EventProcessorRef>,
}

impl InMemoryProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the processor under its own name, returning any processor it replaced.
    #[instrument(level = "debug", skip(self, processor), fields(processor_name=%processor.name()))]
    pub fn register(&self, processor: EventProcessorRef) -> Option<EventProcessorRef> {
        let name = ProcessorName::new(processor.name());
        let prior = self.processors.insert(name, processor);
        if prior.is_some() {
            warn!("replaced previously registered event processor of the same name");
        }
        prior
    }

    #[instrument(level = "debug", skip(self))]
    pub fn deregister(&self, name: &str) -> Option<EventProcessorRef> {
        self.processors.remove(name).map(|(_, processor)| processor)
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl FromIterator<EventProcessorRef> for InMemoryProcessorRegistry {
    fn from_iter<T: IntoIterator<Item = EventProcessorRef>>(processors: T) -> Self {
        let registry = Self::default();
        for processor in processors {
            registry.register(processor);
        }
        registry
    }
}

impl ProcessorRegistry for InMemoryProcessorRegistry {
    fn find(&self, name: &str) -> Option<EventProcessorRef> {
        self.processors.get(name).map(|entry| entry.value().clone())
    }

    fn processor_names(&self) -> Vec<ProcessorName> {
        let mut names: Vec<_> = self
            .processors
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }
}
