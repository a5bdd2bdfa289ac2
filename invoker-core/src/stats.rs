use pdatastructs::tdigest::{TDigest, K1};
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::error;

const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Outcome of a single run.
///
/// `completed_at_deadline` drives `achieved_rps`. `completed` and `failed` are read after the
/// drain, so with [`crate::DrainPolicy::WaitForAll`] they account for every issued request and
/// `latencies.len() == completed`.
#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub target_rps: NonZeroU32,
    pub issued: u64,
    pub completed_at_deadline: u64,
    pub completed: u64,
    pub failed: u64,
    pub elapsed: Duration,
    pub achieved_rps: f64,
    pub latencies: Vec<Duration>,
}

impl RunStatistics {
    /// Completed requests per second over `elapsed`.
    pub fn rps(completed: u64, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0. {
            completed as f64 / secs
        } else {
            0.
        }
    }

    /// Estimated latency at `quantile` over every drained sample.
    ///
    /// `quantile` is clamped to `0.0..=1.0`; NaN reads as `0.0`.
    pub fn latency(&self, quantile: f64) -> Duration {
        if self.latencies.is_empty() {
            return Duration::ZERO;
        }
        let quantile = if quantile.is_nan() {
            0.
        } else {
            quantile.clamp(0., 1.)
        };

        let mut digest = TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE);
        for latency in &self.latencies {
            digest.insert(latency.as_secs_f64());
        }
        let secs = digest.quantile(quantile);

        // NOTE: TDigest can hand back NaN on degenerate inputs.
        let secs = if secs.is_finite() && secs >= 0. {
            secs
        } else {
            error!("Non-finite latency quantile {quantile}");
            0.
        };

        Duration::from_secs_f64(secs)
    }

    pub fn mean_latency(&self) -> Duration {
        if self.latencies.is_empty() {
            return Duration::ZERO;
        }
        let secs: Vec<f64> = self.latencies.iter().map(Duration::as_secs_f64).collect();
        Duration::from_secs_f64(statistical::mean(&secs).max(0.))
    }

    pub fn error_rate(&self) -> f64 {
        if self.completed == 0 {
            0.
        } else {
            self.failed as f64 / self.completed as f64
        }
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RPS={:.2}/{}, issued={}, completed={}, failed={}, mean={}, p50={}, p90={}, p99={}",
            self.achieved_rps,
            self.target_rps,
            self.issued,
            self.completed,
            self.failed,
            humantime::format_duration(truncate_micros(self.mean_latency())),
            humantime::format_duration(truncate_micros(self.latency(0.5))),
            humantime::format_duration(truncate_micros(self.latency(0.9))),
            humantime::format_duration(truncate_micros(self.latency(0.99))),
        )
    }
}

fn truncate_micros(dur: Duration) -> Duration {
    Duration::from_micros(dur.as_micros() as u64)
}
