use claim::*;
use once_cell::sync::Lazy;
use pretty_assertions::assert_eq;
use processor_control::memory::InMemoryProcessorRegistry;
use processor_control::{EventProcessor, ProcessorController, ProcessorError, SegmentId};
use processor_control_test::fixtures::{ProcessorCall, RecordingProcessor, ScriptedOutcome};
use std::sync::Arc;
use std::time::Duration;

const TRACKING_PROCESSOR_NAME: &str = "some-event-processor-name";
const SUBSCRIBING_PROCESSOR_NAME: &str = "some-other-processor";
const SEGMENT_ID: SegmentId = SegmentId::new(0);

struct Setup {
    controller: ProcessorController,
    registry: Arc<InMemoryProcessorRegistry>,
    tracking: Arc<RecordingProcessor>,
    subscribing: Arc<RecordingProcessor>,
}

fn setup() -> Setup {
    Lazy::force(&processor_control_test::setup_tracing::TEST_TRACING);
    let tracking = RecordingProcessor::segmented(TRACKING_PROCESSOR_NAME).into_ref();
    let subscribing = RecordingProcessor::simple(SUBSCRIBING_PROCESSOR_NAME).into_ref();

    let registry = Arc::new(InMemoryProcessorRegistry::new());
    registry.register(tracking.clone());
    registry.register(subscribing.clone());

    Setup {
        controller: ProcessorController::new(registry.clone()),
        registry,
        tracking,
        subscribing,
    }
}

#[test]
fn test_get_event_processor_returns_an_event_processor() {
    let setup = setup();
    let main_span = tracing::info_span!("test_get_event_processor_returns_an_event_processor");
    let _main_span_guard = main_span.enter();

    let result = assert_ok!(setup.controller.processor(TRACKING_PROCESSOR_NAME));
    assert_eq!(result.name(), TRACKING_PROCESSOR_NAME);
    assert_some!(result.as_segmented());
}

#[test]
fn test_get_event_processor_fails_for_non_existing_processor() {
    let setup = setup();
    assert_matches!(
        setup.controller.processor("Z"),
        Err(ProcessorError::NotFound(name)) if name.as_str() == "Z"
    );
}

#[test]
fn test_every_command_on_unknown_processor_fails_without_side_effects() {
    let setup = setup();
    let controller = &setup.controller;

    assert_matches!(controller.start("Z"), Err(ProcessorError::NotFound(_)));
    assert_matches!(controller.pause("Z"), Err(ProcessorError::NotFound(_)));
    assert_matches!(
        controller.release_segment("Z", SEGMENT_ID),
        Err(ProcessorError::NotFound(_))
    );
    assert_matches!(
        controller.split_segment("Z", SEGMENT_ID),
        Err(ProcessorError::NotFound(_))
    );
    assert_matches!(
        controller.merge_segment("Z", SEGMENT_ID),
        Err(ProcessorError::NotFound(_))
    );

    assert!(setup.tracking.calls().is_empty());
    assert!(setup.subscribing.calls().is_empty());
}

#[test]
fn test_pause_processor_calls_shutdown_on_an_event_processor() {
    let setup = setup();
    assert_ok!(setup.controller.pause(TRACKING_PROCESSOR_NAME));

    assert_eq!(setup.tracking.calls(), vec![ProcessorCall::ShutDown]);
    assert!(setup.subscribing.calls().is_empty());
}

#[test]
fn test_start_processor_calls_start_on_an_event_processor() {
    let setup = setup();
    assert_ok!(setup.controller.start(SUBSCRIBING_PROCESSOR_NAME));

    assert_eq!(setup.subscribing.calls(), vec![ProcessorCall::Start]);
    assert!(setup.tracking.calls().is_empty());
    assert!(assert_ok!(setup.controller.describe(SUBSCRIBING_PROCESSOR_NAME)).running);
}

#[test]
fn test_release_segment_calls_release_segment_on_an_event_processor() {
    let setup = setup();
    let segment = SegmentId::new(3);
    assert_ok!(setup.controller.release_segment(TRACKING_PROCESSOR_NAME, segment));

    assert_eq!(
        setup.tracking.calls(),
        vec![ProcessorCall::ReleaseSegment(segment)]
    );
}

#[test]
fn test_release_segment_does_nothing_if_the_event_processor_is_not_segmented() {
    let setup = setup();
    assert_ok!(setup
        .controller
        .release_segment(SUBSCRIBING_PROCESSOR_NAME, SEGMENT_ID));

    assert!(setup.subscribing.calls().is_empty());
}

#[test]
fn test_split_segment_calls_split_on_an_event_processor() {
    let setup = setup();
    let result = assert_ok!(setup
        .controller
        .split_segment(TRACKING_PROCESSOR_NAME, SEGMENT_ID));

    assert_eq!(
        setup.tracking.calls(),
        vec![ProcessorCall::SplitSegment(SEGMENT_ID)]
    );
    assert!(result);
}

#[test]
fn test_split_segment_does_nothing_if_the_event_processor_is_not_segmented() {
    let setup = setup();
    let result = assert_ok!(setup
        .controller
        .split_segment(SUBSCRIBING_PROCESSOR_NAME, SEGMENT_ID));

    assert!(setup.subscribing.calls().is_empty());
    assert!(!result);
}

#[test]
fn test_split_segment_fails_with_the_processor_failure() {
    let setup = setup();
    let failing = RecordingProcessor::segmented("failing-event-processor")
        .with_split(ScriptedOutcome::illegal_state("some-exception"))
        .into_ref();
    setup.registry.register(failing.clone());

    assert_matches!(
        setup.controller.split_segment("failing-event-processor", SEGMENT_ID),
        Err(ProcessorError::IllegalState(msg)) if msg == "some-exception"
    );
    assert_eq!(failing.count_of(ProcessorCall::SplitSegment(SEGMENT_ID)), 1);
}

#[test]
fn test_merge_segment_calls_merge_on_an_event_processor() {
    let setup = setup();
    let result = assert_ok!(setup
        .controller
        .merge_segment(TRACKING_PROCESSOR_NAME, SEGMENT_ID));

    assert_eq!(
        setup.tracking.calls(),
        vec![ProcessorCall::MergeSegment(SEGMENT_ID)]
    );
    assert!(result);
}

#[test]
fn test_merge_segment_does_nothing_if_the_event_processor_is_not_segmented() {
    let setup = setup();
    let result = assert_ok!(setup
        .controller
        .merge_segment(SUBSCRIBING_PROCESSOR_NAME, SEGMENT_ID));

    assert!(setup.subscribing.calls().is_empty());
    assert!(!result);
}

#[test]
fn test_merge_segment_fails_with_the_processor_failure() {
    let setup = setup();
    let failing = RecordingProcessor::segmented("failing-event-processor")
        .with_merge(ScriptedOutcome::illegal_state("some-exception"))
        .into_ref();
    setup.registry.register(failing);

    assert_matches!(
        setup.controller.merge_segment("failing-event-processor", SEGMENT_ID),
        Err(ProcessorError::IllegalState(msg)) if msg == "some-exception"
    );
}

#[test]
fn test_split_segment_returns_the_resolved_outcome() {
    let setup = setup();
    let declining = RecordingProcessor::segmented("declining")
        .with_split(ScriptedOutcome::Resolve(false))
        .with_merge(ScriptedOutcome::Resolve(false))
        .into_ref();
    setup.registry.register(declining);

    assert!(!assert_ok!(setup.controller.split_segment("declining", SEGMENT_ID)));
    assert!(!assert_ok!(setup.controller.merge_segment("declining", SEGMENT_ID)));
}

#[test]
fn test_abandoned_split_is_reported() {
    let setup = setup();
    let abandoning = RecordingProcessor::segmented("abandoning")
        .with_split(ScriptedOutcome::Abandon)
        .into_ref();
    setup.registry.register(abandoning);

    assert_matches!(
        setup.controller.split_segment("abandoning", SEGMENT_ID),
        Err(ProcessorError::Abandoned { .. })
    );
}

#[test]
fn test_deregistered_processor_is_no_longer_resolved() {
    let setup = setup();
    assert_ok!(setup.controller.start(TRACKING_PROCESSOR_NAME));
    assert_some!(setup.registry.deregister(TRACKING_PROCESSOR_NAME));

    assert_matches!(
        setup.controller.start(TRACKING_PROCESSOR_NAME),
        Err(ProcessorError::NotFound(_))
    );
    assert_eq!(setup.tracking.count_of(ProcessorCall::Start), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_split_segment_blocks_until_deferred_resolution() {
    let setup = setup();
    let deferred = RecordingProcessor::segmented("deferred")
        .with_split(ScriptedOutcome::Deferred(Duration::from_millis(50), true))
        .with_merge(ScriptedOutcome::DeferredIllegalState(
            Duration::from_millis(20),
            "merge refused".to_string(),
        ))
        .into_ref();
    setup.registry.register(deferred.clone());

    let controller = setup.controller.clone();
    let (split, merge) = assert_ok!(
        tokio::task::spawn_blocking(move || {
            (
                controller.split_segment("deferred", SEGMENT_ID),
                controller.merge_segment("deferred", SEGMENT_ID),
            )
        })
        .await
    );

    assert!(assert_ok!(split));
    assert_matches!(merge, Err(ProcessorError::IllegalState(msg)) if msg == "merge refused");
    assert_eq!(
        deferred.calls(),
        vec![
            ProcessorCall::SplitSegment(SEGMENT_ID),
            ProcessorCall::MergeSegment(SEGMENT_ID)
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_bounded_split_times_out_on_slow_processor() {
    let setup = setup();
    let slow = RecordingProcessor::segmented("slow")
        .with_split(ScriptedOutcome::Deferred(Duration::from_secs(5), true))
        .into_ref();
    setup.registry.register(slow);

    let controller = setup.controller.clone();
    let result = assert_ok!(
        tokio::task::spawn_blocking(move || {
            controller.split_segment_within("slow", SEGMENT_ID, Duration::from_millis(25))
        })
        .await
    );

    assert_matches!(
        result,
        Err(ProcessorError::TimedOut { timeout, .. }) if timeout == Duration::from_millis(25)
    );
}
