//! Fixed-rate dispatch loop.
use crate::latency::Collector;
use crate::task::invoke;
use crate::timer::Ticker;
use crate::transport::Transport;
use invoker_core::{ConfigError, DrainPolicy, EndpointSet, RunConfig, RunStatistics};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

/// Open-loop benchmark driver.
///
/// Issues one invocation per tick, round-robin over the endpoints, for the configured duration.
/// Invocations are never awaited in the dispatch loop, so slow endpoints do not lower the issue
/// rate.
///
/// # Example
/// ```no_run
/// use invoker::{Driver, GrpcTransport};
/// use invoker_core::{Endpoint, EndpointSet, RunConfig};
/// use std::num::NonZeroU32;
/// use std::time::Duration;
///
/// # async fn run() -> Result<(), invoker_core::ConfigError> {
/// let endpoints = EndpointSet::new(vec![Endpoint::serving("127.0.0.1")])?;
/// let config = RunConfig::new(NonZeroU32::new(10).unwrap(), Duration::from_secs(2))?.port(50051);
/// let stats = Driver::new(endpoints, GrpcTransport::new(), config)?.run().await;
/// println!("{stats}");
/// # Ok(())
/// # }
/// ```
pub struct Driver<T> {
    endpoints: Arc<EndpointSet>,
    transport: Arc<T>,
    config: RunConfig,
}

impl<T: Transport> Driver<T> {
    pub fn new(endpoints: EndpointSet, transport: T, config: RunConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        if endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }

        Ok(Self {
            endpoints: Arc::new(endpoints),
            transport: Arc::new(transport),
            config,
        })
    }

    #[instrument(name = "driver", skip_all, fields(rps = self.config.target_rps.get()))]
    pub async fn run(self) -> RunStatistics {
        let Self {
            endpoints,
            transport,
            config,
        } = self;

        info!(
            "Running against {} endpoints with config {:?}",
            endpoints.len(),
            &config
        );
        if config.tick_floored() {
            warn!(
                "Target of {} RPS exceeds the tick floor; issuing at most one request per {:?}",
                config.target_rps,
                config.tick_interval()
            );
        }

        #[cfg(feature = "metrics")]
        metrics::describe_histogram!(
            crate::task::LATENCY_METRIC,
            metrics::Unit::Nanoseconds,
            "Latency of a single invocation"
        );

        let collector = Collector::new();
        let mut tasks = JoinSet::new();
        let mut issued: u64 = 0;

        let start = Instant::now();
        let deadline = sleep_until(start + config.duration);
        tokio::pin!(deadline);
        let mut ticker = Ticker::new(config.tick_interval(), start);
        debug!("Dispatching every {ticker}");

        // NOTE: This loop is time-sensitive. Nothing in here may await an invocation.
        loop {
            tokio::select! {
                biased;

                _ = &mut deadline => break,
                _ = ticker.tick() => {
                    let n = issued as usize;
                    let endpoints = endpoints.clone();
                    let transport = transport.clone();
                    let recorder = collector.recorder();
                    let port = config.port;
                    let timeout = config.call_timeout;

                    trace!("Tick {n}");
                    tasks.spawn(
                        async move {
                            invoke(endpoints.select(n), port, transport.as_ref(), &recorder, timeout)
                                .await
                        }
                        .in_current_span(),
                    );
                    issued += 1;

                    while let Some(res) = tasks.try_join_next() {
                        if let Err(err) = res {
                            error!("Invocation task failed: {err}");
                        }
                    }
                }
            }
        }

        let elapsed = start.elapsed();
        let completed_at_deadline = collector.completed();
        let achieved_rps = RunStatistics::rps(completed_at_deadline, elapsed);

        info!("Issued / completed requests: {issued}, {completed_at_deadline}");
        info!(
            "Real / target RPS: {achieved_rps:.2} / {}",
            config.target_rps
        );

        match config.drain {
            DrainPolicy::Immediate => {
                debug!("Detaching {} in-flight invocations", tasks.len());
                tasks.detach_all();
            }
            DrainPolicy::WaitForAll => {
                debug!("Waiting on {} in-flight invocations", tasks.len());
                while let Some(res) = tasks.join_next().await {
                    if let Err(err) = res {
                        error!("Invocation task failed: {err}");
                    }
                }
            }
        }

        debug!("Draining {} latency samples", collector.pending_samples());
        let latencies = collector.drain();
        let stats = RunStatistics {
            target_rps: config.target_rps,
            issued,
            completed_at_deadline,
            completed: collector.completed(),
            failed: collector.failed(),
            elapsed,
            achieved_rps,
            latencies,
        };

        info!("Benchmark finished! {stats}");
        stats
    }
}

/// Validate, run, and return the statistics in one call.
pub async fn run_benchmark<T: Transport>(
    endpoints: EndpointSet,
    transport: T,
    config: RunConfig,
) -> Result<RunStatistics, ConfigError> {
    Ok(Driver::new(endpoints, transport, config)?.run().await)
}
