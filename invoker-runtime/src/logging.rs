use opentelemetry::global;
use opentelemetry::trace::TraceError;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::Tracer;
use tracing::warn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const SERVICE_NAME: &str = "invoker";

/// Install the global subscriber. `RUST_LOG` wins over `debug`.
///
/// With a `zipkin` collector, closed spans are also reported locally with their timing and
/// exported to the collector, and trace context is propagated in W3C `traceparent` form. A
/// collector that cannot be set up is logged and the run continues untraced.
pub fn init(debug: bool, zipkin: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(debug));

    let span_events = if zipkin.is_some() {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let (tracer, tracer_err) = match zipkin.map(zipkin_tracer) {
        Some(Ok(tracer)) => (Some(tracer), None),
        Some(Err(err)) => (None, Some(err)),
        None => (None, None),
    };
    let telemetry = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    let res = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_span_events(span_events))
        .with(telemetry)
        .try_init();

    if res.is_err() {
        tracing::debug!("Subscriber already installed");
    }
    if let Some(err) = tracer_err {
        warn!("Failed to set up the Zipkin exporter, tracing disabled: {err}");
    }
}

/// Flush spans still buffered for the collector. Blocks, so call it off the async workers.
pub fn shutdown() {
    global::shutdown_tracer_provider();
}

fn zipkin_tracer(endpoint: &str) -> Result<Tracer, TraceError> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    opentelemetry_zipkin::new_pipeline()
        .with_service_name(SERVICE_NAME)
        .with_collector_endpoint(endpoint)
        .install_batch(opentelemetry_sdk::runtime::Tokio)
}

fn default_filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::new("invoker=debug,invoker_runtime=debug")
    } else {
        EnvFilter::new("invoker=info,invoker_runtime=info")
    }
}
