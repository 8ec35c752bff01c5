mod pending;
mod registry;

pub use pending::{Completer, PendingError, PendingResult};
pub use registry::{ProcessorRegistry, ProcessorRegistryRef};

use smol_str::SmolStr;
use std::borrow::Borrow;
use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Duration;
use strum_macros::{Display, EnumString, EnumVariantNames, IntoStaticStr};
use thiserror::Error;

/// Unique name an event processor is registered under.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct ProcessorName(SmolStr);

impl ProcessorName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(SmolStr::new(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ProcessorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProcessorName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for ProcessorName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<SmolStr> for ProcessorName {
    fn from(name: SmolStr) -> Self {
        Self(name)
    }
}

impl AsRef<str> for ProcessorName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl Borrow<str> for ProcessorName {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

/// Identifies a contiguous unit of partitioned work owned by a segmented processor. Range and
/// ownership are the processor's concern.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct SegmentId(u32);

impl SegmentId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SegmentId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

pub type EventProcessorRef = Arc<dyn EventProcessor>;

/// A worker consuming a stream of events. Every processor can be started and shut down;
/// processors that partition their work into segments additionally expose
/// [`SegmentedEventProcessor`] via [`EventProcessor::as_segmented`].
pub trait EventProcessor: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn is_running(&self) -> bool;

    /// Requests the processor begin consuming events.
    fn start(&self) -> Result<(), ProcessorError>;

    /// Requests the processor stop consuming events.
    fn shut_down(&self) -> Result<(), ProcessorError>;

    /// Segment rebalancing capability. Simple processors keep the default `None`.
    fn as_segmented(&self) -> Option<&dyn SegmentedEventProcessor> {
        None
    }

    fn kind(&self) -> ProcessorKind {
        if self.as_segmented().is_some() {
            ProcessorKind::Segmented
        } else {
            ProcessorKind::Simple
        }
    }
}

/// Capability extension for processors whose work is partitioned into segments.
pub trait SegmentedEventProcessor: EventProcessor {
    /// Relinquishes ownership of the segment so another instance may claim it.
    fn release_segment(&self, segment: SegmentId) -> Result<(), ProcessorError>;

    /// Splits the segment in two. Resolves to `true` if the split was performed.
    fn split_segment(&self, segment: SegmentId) -> PendingResult<bool>;

    /// Merges the segment with its counterpart. Resolves to `true` if the merge was performed.
    fn merge_segment(&self, segment: SegmentId) -> PendingResult<bool>;

    fn claimed_segments(&self) -> Vec<SegmentId>;
}

#[derive(
    Debug,
    Display,
    Copy,
    Clone,
    PartialEq,
    Eq,
    EnumString,
    EnumVariantNames,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
pub enum ProcessorKind {
    Simple,
    Segmented,
}

#[derive(
    Debug, Display, Copy, Clone, PartialEq, Eq, EnumString, EnumVariantNames, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum SegmentOperation {
    Split,
    Merge,
}

/// Point-in-time status of a registered processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorInfo {
    pub name: ProcessorName,
    pub kind: ProcessorKind,
    pub running: bool,
    pub claimed_segments: Vec<SegmentId>,
}

impl ProcessorInfo {
    pub fn of(processor: &dyn EventProcessor) -> Self {
        let claimed_segments = processor
            .as_segmented()
            .map(|segmented| {
                let mut segments = segmented.claimed_segments();
                segments.sort_unstable();
                segments
            })
            .unwrap_or_default();

        Self {
            name: ProcessorName::new(processor.name()),
            kind: processor.kind(),
            running: processor.is_running(),
            claimed_segments,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("no event processor registered under name: {0}")]
    NotFound(ProcessorName),

    #[error("illegal processor state: {0}")]
    IllegalState(String),

    #[error("segment {segment} is not claimed by processor {processor}")]
    SegmentNotClaimed {
        processor: ProcessorName,
        segment: SegmentId,
    },

    #[error("{operation} of segment {segment} on processor {processor} was abandoned before resolving")]
    Abandoned {
        processor: ProcessorName,
        operation: SegmentOperation,
        segment: SegmentId,
    },

    #[error("{operation} of segment {segment} on processor {processor} did not resolve within {timeout:?}")]
    TimedOut {
        processor: ProcessorName,
        operation: SegmentOperation,
        segment: SegmentId,
        timeout: Duration,
    },

    #[error("{0}")]
    Worker(#[from] anyhow::Error),
}

impl ProcessorError {
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState(message.into())
    }
}
