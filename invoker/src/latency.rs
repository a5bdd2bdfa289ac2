use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Append-only latency samples shared by every in-flight invocation.
///
/// The lock is only held for a single push or the final drain, never across a remote call.
#[derive(Debug, Default)]
pub struct LatencyStore {
    samples: Mutex<Vec<Duration>>,
}

impl LatencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, sample: Duration) {
        self.lock().push(sample);
    }

    /// Take every sample recorded so far, in the order they landed.
    pub fn drain(&self) -> Vec<Duration> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Duration>> {
        // A panic mid-push cannot leave a Vec<Duration> half-written.
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Default)]
struct Shared {
    completed: AtomicU64,
    failed: AtomicU64,
    latencies: LatencyStore,
}

/// Run-wide counters and latency store. Owned by the driver; invocations only get a
/// [`Recorder`].
#[derive(Debug, Default)]
pub struct Collector {
    shared: Arc<Shared>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorder(&self) -> Recorder {
        Recorder {
            shared: self.shared.clone(),
        }
    }

    pub fn completed(&self) -> u64 {
        self.shared.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.shared.failed.load(Ordering::Relaxed)
    }

    pub fn drain(&self) -> Vec<Duration> {
        self.shared.latencies.drain()
    }

    pub fn pending_samples(&self) -> usize {
        self.shared.latencies.len()
    }
}

/// Write-only handle given to each invocation.
#[derive(Clone, Debug)]
pub struct Recorder {
    shared: Arc<Shared>,
}

impl Recorder {
    /// Record one finished invocation. Failed calls still count as completed.
    pub fn record(&self, elapsed: Duration, success: bool) {
        self.shared.latencies.record(elapsed);
        if !success {
            self.shared.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.shared.completed.fetch_add(1, Ordering::Relaxed);
    }
}
