pub mod recording;
pub mod tracking;

pub use recording::{ProcessorCall, RecordingProcessor, ScriptedOutcome};
pub use tracking::TrackingProcessor;
