use super::ProcessorError;
use parking_lot::{Condvar, Mutex};
use std::fmt::{self, Debug};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Failure of a [`PendingResult`]. Only `Failed` carries a cause produced by the worker; the other
/// variants describe the pending handle itself.
#[derive(Debug, Error)]
pub enum PendingError {
    #[error("{0}")]
    Failed(ProcessorError),

    #[error("pending result was abandoned before resolution")]
    Abandoned,

    #[error("pending result did not resolve within {0:?}")]
    TimedOut(Duration),
}

impl PendingError {
    /// The worker-produced cause, if this failure has one.
    #[allow(clippy::missing_const_for_fn)]
    pub fn into_cause(self) -> Option<ProcessorError> {
        match self {
            Self::Failed(cause) => Some(cause),
            Self::Abandoned | Self::TimedOut(_) => None,
        }
    }
}

enum Resolution<T> {
    Resolved(Result<T, ProcessorError>),
    Abandoned,
}

impl<T> Resolution<T> {
    fn into_result(self) -> Result<T, PendingError> {
        match self {
            Self::Resolved(result) => result.map_err(PendingError::Failed),
            Self::Abandoned => Err(PendingError::Abandoned),
        }
    }
}

struct Slot<T> {
    resolution: Option<Resolution<T>>,
    waker: Option<Waker>,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    resolved: Condvar,
}

/// Result of an asynchronous processor operation that eventually resolves to a value or a
/// failure. The holder may block on it ([`PendingResult::wait`],
/// [`PendingResult::wait_timeout`]) or `.await` it.
///
/// Blocking is only safe off the executor expected to drive the matching [`Completer`].
#[must_use = "a pending result does nothing unless waited upon"]
pub struct PendingResult<T> {
    shared: Arc<Shared<T>>,
}

/// Resolving side of a [`PendingResult`], held by the worker. Dropping it unresolved resolves the
/// pending result as [`PendingError::Abandoned`].
pub struct Completer<T> {
    shared: Arc<Shared<T>>,
    settled: bool,
}

impl<T> PendingResult<T> {
    pub fn channel() -> (Completer<T>, Self) {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                resolution: None,
                waker: None,
            }),
            resolved: Condvar::new(),
        });

        let completer = Completer {
            shared: shared.clone(),
            settled: false,
        };

        (completer, Self { shared })
    }

    pub fn resolved(value: T) -> Self {
        Self::from_result(Ok(value))
    }

    pub fn failed(error: impl Into<ProcessorError>) -> Self {
        Self::from_result(Err(error.into()))
    }

    pub fn from_result(result: Result<T, ProcessorError>) -> Self {
        let (completer, pending) = Self::channel();
        completer.complete(result);
        pending
    }

    pub fn is_resolved(&self) -> bool {
        self.shared.slot.lock().resolution.is_some()
    }

    /// Blocks the calling thread until the result resolves.
    pub fn wait(self) -> Result<T, PendingError> {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(resolution) = slot.resolution.take() {
                return resolution.into_result();
            }
            self.shared.resolved.wait(&mut slot);
        }
    }

    /// Blocks the calling thread until the result resolves or `timeout` elapses. A timeout too
    /// large to express as a deadline waits without bound.
    pub fn wait_timeout(self, timeout: Duration) -> Result<T, PendingError> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.wait();
        };
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(resolution) = slot.resolution.take() {
                return resolution.into_result();
            }

            if self
                .shared
                .resolved
                .wait_until(&mut slot, deadline)
                .timed_out()
            {
                return slot
                    .resolution
                    .take()
                    .map_or(Err(PendingError::TimedOut(timeout)), Resolution::into_result);
            }
        }
    }
}

impl<T> Future for PendingResult<T> {
    type Output = Result<T, PendingError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.shared.slot.lock();
        match slot.resolution.take() {
            Some(resolution) => Poll::Ready(resolution.into_result()),
            None => {
                slot.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl<T> Debug for PendingResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResult")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl<T> Completer<T> {
    pub fn complete(mut self, result: Result<T, ProcessorError>) {
        self.settle(Resolution::Resolved(result));
    }

    pub fn succeed(self, value: T) {
        self.complete(Ok(value));
    }

    pub fn fail(self, error: impl Into<ProcessorError>) {
        self.complete(Err(error.into()));
    }

    fn settle(&mut self, resolution: Resolution<T>) {
        self.settled = true;
        let waker = {
            let mut slot = self.shared.slot.lock();
            slot.resolution = Some(resolution);
            slot.waker.take()
        };

        self.shared.resolved.notify_all();
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if !self.settled {
            self.settle(Resolution::Abandoned);
        }
    }
}

impl<T> Debug for Completer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("settled", &self.settled)
            .finish()
    }
}
