use crate::latency::Recorder;
use crate::transport::{Transport, TransportError};
use invoker_core::Endpoint;
use std::time::Duration;
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, trace, warn};

#[cfg(feature = "metrics")]
pub(crate) const LATENCY_METRIC: &str = "invoker_latency";
#[cfg(feature = "metrics")]
pub(crate) const SUCCESS_METRIC: &str = "invoker_success";
#[cfg(feature = "metrics")]
pub(crate) const ERROR_METRIC: &str = "invoker_error";

/// Perform exactly one call against `endpoint` and record it.
///
/// Every invocation produces one latency sample and one completion, whether the call succeeded,
/// failed or timed out. Failed calls are never retried.
pub async fn invoke<T: Transport>(
    endpoint: &Endpoint,
    port: u16,
    transport: &T,
    recorder: &Recorder,
    timeout: Duration,
) {
    let address = endpoint.address(port);
    debug!("Invoking {} function at {address}", endpoint.mode());

    let start = Instant::now();
    let res = match tokio::time::timeout(timeout, transport.call(&address, timeout)).await {
        Ok(res) => res,
        Err(_) => Err(TransportError::Timeout(timeout)),
    };
    let elapsed = start.elapsed();

    if let Err(err) = &res {
        warn!("Failed to invoke {address}, err={err}");
    }
    debug!("Invoked {address} in {} usec", elapsed.as_micros());

    #[cfg(feature = "metrics")]
    record_metrics(elapsed, res.is_ok());

    recorder.record(elapsed, res.is_ok());
}

#[cfg(feature = "metrics")]
fn record_metrics(elapsed: Duration, success: bool) {
    metrics::histogram!(LATENCY_METRIC).record(elapsed.as_nanos() as f64);
    if success {
        metrics::counter!(SUCCESS_METRIC).increment(1);
    } else {
        metrics::counter!(ERROR_METRIC).increment(1);
    }
}
