use crate::{
    ConfigError, DEFAULT_CALL_TIMEOUT, DEFAULT_DURATION, DEFAULT_PORT, DEFAULT_RPS,
    MIN_DURATION, MIN_TICK_INTERVAL,
};
use std::num::NonZeroU32;
use std::time::Duration;

/// What the driver does with invocations still in flight when the deadline fires.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum DrainPolicy {
    /// Drain the latency store right away. In-flight invocations are detached and may keep
    /// appending after the drain; their samples are lost to the report.
    Immediate,
    /// Join every spawned invocation before draining. Bounded by the call timeout.
    #[default]
    WaitForAll,
}

/// Parameters of a single run. Immutable once the driver starts.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub target_rps: NonZeroU32,
    pub duration: Duration,
    pub port: u16,
    pub tracing: bool,
    pub drain: DrainPolicy,
    pub call_timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target_rps: DEFAULT_RPS,
            duration: DEFAULT_DURATION,
            port: DEFAULT_PORT,
            tracing: false,
            drain: DrainPolicy::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl RunConfig {
    pub fn new(target_rps: NonZeroU32, duration: Duration) -> Result<Self, ConfigError> {
        let config = Self {
            target_rps,
            duration,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration < MIN_DURATION {
            return Err(ConfigError::InvalidDuration(self.duration));
        }
        Ok(())
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn tracing(mut self, tracing: bool) -> Self {
        self.tracing = tracing;
        self
    }

    pub fn drain(mut self, drain: DrainPolicy) -> Self {
        self.drain = drain;
        self
    }

    pub fn call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Spacing between dispatch ticks: `1000 / rps` whole milliseconds, never below
    /// [`MIN_TICK_INTERVAL`].
    pub fn tick_interval(&self) -> Duration {
        let millis = 1_000 / u64::from(self.target_rps.get());
        Duration::from_millis(millis).max(MIN_TICK_INTERVAL)
    }

    /// Whether the requested rate is above what the tick floor can deliver.
    pub fn tick_floored(&self) -> bool {
        1_000 / self.target_rps.get() == 0
    }
}
