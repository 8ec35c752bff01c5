use parking_lot::Mutex;
use processor_control::{
    EventProcessor, PendingResult, ProcessorError, SegmentId, SegmentedEventProcessor,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Every interaction a controller can have with a processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorCall {
    Start,
    ShutDown,
    ReleaseSegment(SegmentId),
    SplitSegment(SegmentId),
    MergeSegment(SegmentId),
}

/// How a [`RecordingProcessor`] resolves a split or merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    Resolve(bool),
    IllegalState(String),
    /// Resolves from a tokio task after the delay; requires a runtime context.
    Deferred(Duration, bool),
    /// Fails from a tokio task after the delay; requires a runtime context.
    DeferredIllegalState(Duration, String),
    /// Drops the completer without resolving.
    Abandon,
}

impl ScriptedOutcome {
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState(message.into())
    }

    fn pending(&self) -> PendingResult<bool> {
        match self {
            Self::Resolve(value) => PendingResult::resolved(*value),

            Self::IllegalState(message) => {
                PendingResult::failed(ProcessorError::illegal_state(message.as_str()))
            }

            Self::Deferred(delay, value) => Self::defer(*delay, Ok(*value)),

            Self::DeferredIllegalState(delay, message) => {
                Self::defer(*delay, Err(ProcessorError::illegal_state(message.as_str())))
            }

            Self::Abandon => PendingResult::channel().1,
        }
    }

    fn defer(delay: Duration, outcome: Result<bool, ProcessorError>) -> PendingResult<bool> {
        let (completer, pending) = PendingResult::channel();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(?outcome, "resolving deferred segment operation");
            completer.complete(outcome);
        });
        pending
    }
}

/// Processor double that records every call made on it. Built either as a simple processor or as
/// a segmented one whose splits and merges resolve per their [`ScriptedOutcome`].
#[derive(Debug)]
pub struct RecordingProcessor {
    name: String,
    segmented: bool,
    running: AtomicBool,
    split_outcome: ScriptedOutcome,
    merge_outcome: ScriptedOutcome,
    claimed: Vec<SegmentId>,
    calls: Mutex<Vec<ProcessorCall>>,
}

impl RecordingProcessor {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            segmented: false,
            running: AtomicBool::new(false),
            split_outcome: ScriptedOutcome::Resolve(true),
            merge_outcome: ScriptedOutcome::Resolve(true),
            claimed: Vec::new(),
            calls: Mutex::default(),
        }
    }

    pub fn segmented(name: impl Into<String>) -> Self {
        Self {
            segmented: true,
            claimed: vec![SegmentId::new(0)],
            ..Self::simple(name)
        }
    }

    pub fn with_split(self, outcome: ScriptedOutcome) -> Self {
        Self {
            split_outcome: outcome,
            ..self
        }
    }

    pub fn with_merge(self, outcome: ScriptedOutcome) -> Self {
        Self {
            merge_outcome: outcome,
            ..self
        }
    }

    pub fn with_claimed(self, segments: impl IntoIterator<Item = u32>) -> Self {
        Self {
            claimed: segments.into_iter().map(SegmentId::new).collect(),
            ..self
        }
    }

    pub fn into_ref(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<ProcessorCall> {
        self.calls.lock().clone()
    }

    pub fn count_of(&self, call: ProcessorCall) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    fn record(&self, call: ProcessorCall) {
        debug!(processor_name=%self.name, ?call, "recording processor call");
        self.calls.lock().push(call);
    }
}

impl EventProcessor for RecordingProcessor {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn start(&self) -> Result<(), ProcessorError> {
        self.record(ProcessorCall::Start);
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    fn shut_down(&self) -> Result<(), ProcessorError> {
        self.record(ProcessorCall::ShutDown);
        self.running.store(false, Ordering::Release);
        Ok(())
    }

    fn as_segmented(&self) -> Option<&dyn SegmentedEventProcessor> {
        if self.segmented {
            Some(self as &dyn SegmentedEventProcessor)
        } else {
            None
        }
    }
}

impl SegmentedEventProcessor for RecordingProcessor {
    fn release_segment(&self, segment: SegmentId) -> Result<(), ProcessorError> {
        self.record(ProcessorCall::ReleaseSegment(segment));
        Ok(())
    }

    fn split_segment(&self, segment: SegmentId) -> PendingResult<bool> {
        self.record(ProcessorCall::SplitSegment(segment));
        self.split_outcome.pending()
    }

    fn merge_segment(&self, segment: SegmentId) -> PendingResult<bool> {
        self.record(ProcessorCall::MergeSegment(segment));
        self.merge_outcome.pending()
    }

    fn claimed_segments(&self) -> Vec<SegmentId> {
        self.claimed.clone()
    }
}
