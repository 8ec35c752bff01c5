use parking_lot::RwLock;
use processor_control::{
    Completer, EventProcessor, PendingResult, ProcessorError, ProcessorName, SegmentId,
    SegmentedEventProcessor,
};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub mod protocol {
    use processor_control::{Completer, SegmentId};
    use tokio::sync::{mpsc, oneshot};

    pub type TrackingApi = mpsc::UnboundedSender<TrackingCommand>;

    #[derive(Debug)]
    pub enum TrackingCommand {
        Split(SegmentId, Completer<bool>),
        Merge(SegmentId, Completer<bool>),
        Halt(oneshot::Sender<()>),
    }
}

use protocol::{TrackingApi, TrackingCommand};

type ClaimedSegments = Arc<RwLock<BTreeSet<SegmentId>>>;

/// Segmented processor double whose splits and merges are resolved by a command loop running on
/// a tokio task, so callers observe resolution from another thread. Splitting a claimed segment
/// claims the next free segment id; merging a claimed segment gives up the highest other claimed
/// segment.
pub struct TrackingProcessor {
    name: ProcessorName,
    running: Arc<AtomicBool>,
    claimed: ClaimedSegments,
    tx_api: TrackingApi,
    handle: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for TrackingProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingProcessor")
            .field("name", &self.name)
            .field("running", &self.running)
            .field("claimed", &self.claimed)
            .finish()
    }
}

impl TrackingProcessor {
    /// Spawns the command loop; must be called from within a tokio runtime.
    pub fn spawn(
        name: impl AsRef<str>,
        claimed: impl IntoIterator<Item = u32>,
        latency: Duration,
    ) -> Arc<Self> {
        let name = ProcessorName::new(name);
        let running = Arc::new(AtomicBool::new(true));
        let claimed: ClaimedSegments = Arc::new(RwLock::new(
            claimed.into_iter().map(SegmentId::new).collect(),
        ));
        let (tx_api, rx_api) = mpsc::unbounded_channel();

        let handle = tokio::spawn(Self::run(
            name.clone(),
            rx_api,
            running.clone(),
            claimed.clone(),
            latency,
        ));

        Arc::new(Self {
            name,
            running,
            claimed,
            tx_api,
            handle: parking_lot::Mutex::new(Some(handle)),
        })
    }

    /// Stops the command loop. Segment operations issued afterwards are abandoned.
    pub async fn halt(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx_api.send(TrackingCommand::Halt(tx)).is_ok() {
            let _ignore = rx.await;
        }

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ignore = handle.await;
        }
    }

    #[instrument(level = "debug", skip(rx_api, running, claimed))]
    async fn run(
        name: ProcessorName,
        mut rx_api: mpsc::UnboundedReceiver<TrackingCommand>,
        running: Arc<AtomicBool>,
        claimed: ClaimedSegments,
        latency: Duration,
    ) {
        while let Some(command) = rx_api.recv().await {
            match command {
                TrackingCommand::Halt(tx_reply) => {
                    debug!("HALT command received by processor: {name}");
                    let _ignore = tx_reply.send(());
                    break;
                }

                TrackingCommand::Split(segment, completer) => {
                    tokio::time::sleep(latency).await;
                    let outcome = Self::ensure_running(&name, &running)
                        .map(|()| Self::do_split(&claimed, segment));
                    debug!(?outcome, %segment, "split resolved by processor: {name}");
                    completer.complete(outcome);
                }

                TrackingCommand::Merge(segment, completer) => {
                    tokio::time::sleep(latency).await;
                    let outcome = Self::ensure_running(&name, &running)
                        .and_then(|()| Self::do_merge(&name, &claimed, segment));
                    debug!(?outcome, %segment, "merge resolved by processor: {name}");
                    completer.complete(outcome);
                }
            }
        }

        rx_api.close();
    }

    fn ensure_running(name: &ProcessorName, running: &AtomicBool) -> Result<(), ProcessorError> {
        if running.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ProcessorError::illegal_state(format!(
                "processor {name} is shut down"
            )))
        }
    }

    fn do_split(claimed: &ClaimedSegments, segment: SegmentId) -> bool {
        let mut claimed = claimed.write();
        if !claimed.contains(&segment) {
            return false;
        }

        let next = claimed
            .iter()
            .next_back()
            .map_or(Some(0), |s| s.as_u32().checked_add(1));
        next.map_or(false, |next| claimed.insert(SegmentId::new(next)))
    }

    fn do_merge(
        name: &ProcessorName,
        claimed: &ClaimedSegments,
        segment: SegmentId,
    ) -> Result<bool, ProcessorError> {
        let mut claimed = claimed.write();
        if !claimed.contains(&segment) {
            return Err(ProcessorError::SegmentNotClaimed {
                processor: name.clone(),
                segment,
            });
        }

        let counterpart = claimed.iter().rev().find(|s| **s != segment).copied();
        Ok(counterpart.map_or(false, |other| claimed.remove(&other)))
    }

    fn submit(
        &self,
        command: impl FnOnce(Completer<bool>) -> TrackingCommand,
    ) -> PendingResult<bool> {
        let (completer, pending) = PendingResult::channel();
        if let Err(error) = self.tx_api.send(command(completer)) {
            // the returned command drops its completer, abandoning the pending result
            warn!(processor_name=%self.name, "processor command loop is closed: {error}");
        }
        pending
    }
}

impl EventProcessor for TrackingProcessor {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn start(&self) -> Result<(), ProcessorError> {
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    fn shut_down(&self) -> Result<(), ProcessorError> {
        if self.running.swap(false, Ordering::AcqRel) {
            Ok(())
        } else {
            Err(ProcessorError::illegal_state(format!(
                "processor {} is already shut down",
                self.name
            )))
        }
    }

    fn as_segmented(&self) -> Option<&dyn SegmentedEventProcessor> {
        Some(self)
    }
}

impl SegmentedEventProcessor for TrackingProcessor {
    fn release_segment(&self, segment: SegmentId) -> Result<(), ProcessorError> {
        if self.claimed.write().remove(&segment) {
            Ok(())
        } else {
            Err(ProcessorError::SegmentNotClaimed {
                processor: self.name.clone(),
                segment,
            })
        }
    }

    fn split_segment(&self, segment: SegmentId) -> PendingResult<bool> {
        self.submit(|completer| TrackingCommand::Split(segment, completer))
    }

    fn merge_segment(&self, segment: SegmentId) -> PendingResult<bool> {
        self.submit(|completer| TrackingCommand::Merge(segment, completer))
    }

    fn claimed_segments(&self) -> Vec<SegmentId> {
        self.claimed.read().iter().copied().collect()
    }
}
