use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Fixed-rate dispatch clock.
///
/// The first tick fires at `start`. Late ticks are caught up in a burst so the number of ticks
/// tracks wall-clock time rather than driver latency.
pub(crate) struct Ticker {
    interval: Interval,
    interval_dur: Duration,
}

impl Ticker {
    pub fn new(interval_dur: Duration, start: Instant) -> Self {
        let mut interval = interval_at(start, interval_dur);
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
        Self {
            interval,
            interval_dur,
        }
    }

    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", humantime::format_duration(self.interval_dur))
    }
}
