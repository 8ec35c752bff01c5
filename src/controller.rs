use crate::config::ControllerSettings;
use crate::processor::{
    EventProcessorRef, PendingError, ProcessorError, ProcessorInfo, ProcessorName,
    ProcessorRegistryRef, SegmentId, SegmentOperation,
};
use std::fmt;
use std::time::Duration;

/// Single entry point for operating the event processors of a [`crate::ProcessorRegistry`] by
/// name. Every command re-resolves its processor; nothing is cached between calls.
///
/// Segment commands against processors without segment support are not errors:
/// `release_segment` does nothing and `split_segment`/`merge_segment` answer `false`.
///
/// `split_segment` and `merge_segment` block the calling thread until the processor resolves the
/// operation, so they must not be called from the executor thread the processor depends upon to
/// resolve it.
#[derive(Clone)]
pub struct ProcessorController {
    registry: ProcessorRegistryRef,
    settings: ControllerSettings,
}

impl fmt::Debug for ProcessorController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorController")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ProcessorController {
    pub fn new(registry: ProcessorRegistryRef) -> Self {
        Self {
            registry,
            settings: ControllerSettings::default(),
        }
    }

    #[allow(clippy::missing_const_for_fn)]
    pub fn with_settings(self, settings: ControllerSettings) -> Self {
        Self { settings, ..self }
    }

    pub const fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Resolves the processor registered under `name`.
    #[instrument(level = "trace", skip(self))]
    pub fn processor(&self, name: &str) -> Result<EventProcessorRef, ProcessorError> {
        self.registry
            .find(name)
            .ok_or_else(|| ProcessorError::NotFound(ProcessorName::new(name)))
    }

    #[instrument(level = "debug", skip(self))]
    pub fn pause(&self, name: &str) -> Result<(), ProcessorError> {
        let processor = self.processor(name)?;
        debug!("shutting down event processor");
        processor.shut_down()
    }

    #[instrument(level = "debug", skip(self))]
    pub fn start(&self, name: &str) -> Result<(), ProcessorError> {
        let processor = self.processor(name)?;
        debug!("starting event processor");
        processor.start()
    }

    #[instrument(level = "debug", skip(self))]
    pub fn release_segment(&self, name: &str, segment: SegmentId) -> Result<(), ProcessorError> {
        let processor = self.processor(name)?;
        match processor.as_segmented() {
            Some(segmented) => segmented.release_segment(segment),
            None => {
                debug!("event processor does not support segments - ignoring release");
                Ok(())
            }
        }
    }

    /// Splits the segment, blocking until the processor resolves the split.
    pub fn split_segment(&self, name: &str, segment: SegmentId) -> Result<bool, ProcessorError> {
        self.rebalance(
            name,
            segment,
            SegmentOperation::Split,
            self.settings.segment_operation_timeout,
        )
    }

    /// Splits the segment, waiting at most `timeout` for the processor to resolve the split.
    pub fn split_segment_within(
        &self,
        name: &str,
        segment: SegmentId,
        timeout: Duration,
    ) -> Result<bool, ProcessorError> {
        self.rebalance(name, segment, SegmentOperation::Split, Some(timeout))
    }

    /// Merges the segment, blocking until the processor resolves the merge.
    pub fn merge_segment(&self, name: &str, segment: SegmentId) -> Result<bool, ProcessorError> {
        self.rebalance(
            name,
            segment,
            SegmentOperation::Merge,
            self.settings.segment_operation_timeout,
        )
    }

    /// Merges the segment, waiting at most `timeout` for the processor to resolve the merge.
    pub fn merge_segment_within(
        &self,
        name: &str,
        segment: SegmentId,
        timeout: Duration,
    ) -> Result<bool, ProcessorError> {
        self.rebalance(name, segment, SegmentOperation::Merge, Some(timeout))
    }

    #[instrument(level = "debug", skip(self))]
    pub fn describe(&self, name: &str) -> Result<ProcessorInfo, ProcessorError> {
        let processor = self.processor(name)?;
        Ok(ProcessorInfo::of(processor.as_ref()))
    }

    /// Describes every registered processor. Processors deregistered while listing are skipped.
    #[instrument(level = "debug", skip(self))]
    pub fn describe_all(&self) -> Vec<ProcessorInfo> {
        self.registry
            .processor_names()
            .into_iter()
            .filter_map(|name| self.registry.find(name.as_str()))
            .map(|processor| ProcessorInfo::of(processor.as_ref()))
            .collect()
    }

    #[instrument(level = "debug", skip(self))]
    fn rebalance(
        &self,
        name: &str,
        segment: SegmentId,
        operation: SegmentOperation,
        timeout: Option<Duration>,
    ) -> Result<bool, ProcessorError> {
        let processor = self.processor(name)?;
        let Some(segmented) = processor.as_segmented() else {
            debug!("event processor does not support segments - skipping {operation}");
            return Ok(false);
        };

        let pending = match operation {
            SegmentOperation::Split => segmented.split_segment(segment),
            SegmentOperation::Merge => segmented.merge_segment(segment),
        };

        let outcome = match timeout {
            Some(timeout) => pending.wait_timeout(timeout),
            None => pending.wait(),
        };

        outcome.map_err(|error| match error {
            PendingError::Failed(cause) => cause,
            PendingError::Abandoned => ProcessorError::Abandoned {
                processor: ProcessorName::new(name),
                operation,
                segment,
            },
            PendingError::TimedOut(timeout) => ProcessorError::TimedOut {
                processor: ProcessorName::new(name),
                operation,
                segment,
                timeout,
            },
        })
    }
}
