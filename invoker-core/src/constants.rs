use std::num::NonZeroU32;
use std::time::Duration;

/// Default target rate when none is given.
pub const DEFAULT_RPS: NonZeroU32 = unsafe { NonZeroU32::new_unchecked(1) };

/// Default run length.
pub const DEFAULT_DURATION: Duration = Duration::from_secs(5);

/// Shortest allowed run. Anything below a second makes the achieved RPS meaningless.
pub const MIN_DURATION: Duration = Duration::from_secs(1);

/// Port applied to every endpoint unless overridden.
pub const DEFAULT_PORT: u16 = 80;

/// Upper bound on a single remote call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Floor for the dispatch tick interval. Rates above 1000 RPS truncate to a zero
/// millisecond interval, which would spin the driver.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Second field marking an endpoint line as eventing.
pub const EVENTING_TAG: &str = "eventing";
