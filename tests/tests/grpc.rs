mod utils;
use utils::*;

use invoker::{output_file_name, run_benchmark, GrpcTransport, Transport, TransportError};
use invoker_core::{DrainPolicy, Endpoint, EndpointSet, RunConfig};
use invoker_runtime::InvokerRuntime;
use std::num::NonZeroU32;
use std::time::Duration;

fn config(rps: u32, secs: u64, port: u16) -> anyhow::Result<RunConfig> {
    Ok(
        RunConfig::new(NonZeroU32::new(rps).unwrap(), Duration::from_secs(secs))?
            .port(port)
            .call_timeout(Duration::from_secs(5)),
    )
}

#[tokio::test]
async fn say_hello_round_trip() -> anyhow::Result<()> {
    init();
    let (greeter, port) = mock(mock_delay(0)).await?;

    GrpcTransport::new()
        .call(&format!("http://127.0.0.1:{port}"), Duration::from_secs(5))
        .await?;
    assert_eq!(greeter.served(), 1);
    Ok(())
}

#[tokio::test]
async fn trace_context_reaches_the_callee() -> anyhow::Result<()> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_sdk::propagation::TraceContextPropagator;
    use opentelemetry_sdk::trace::TracerProvider;
    use tracing_subscriber::layer::SubscriberExt;

    let (greeter, port) = mock(mock_delay(0)).await?;
    let address = format!("http://127.0.0.1:{port}");

    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
    let provider = TracerProvider::builder().build();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("invoker-tests")));
    let _default = tracing::subscriber::set_default(subscriber);

    GrpcTransport::new()
        .call(&address, Duration::from_secs(5))
        .await?;
    GrpcTransport::new()
        .with_tracing(true)
        .call(&address, Duration::from_secs(5))
        .await?;

    assert_eq!(greeter.served(), 2);
    assert_eq!(greeter.traced(), 1);
    Ok(())
}

#[tokio::test]
async fn limited_greeter_rejects_with_status() -> anyhow::Result<()> {
    init();
    let limited = mock_delay(0).limited(NonZeroU32::new(1).unwrap());
    let (greeter, port) = mock(limited).await?;

    // The first call fits the quota, the second is rejected.
    let transport = GrpcTransport::new().name("limited");
    let address = format!("http://127.0.0.1:{port}");
    transport.call(&address, Duration::from_secs(5)).await?;
    match transport.call(&address, Duration::from_secs(5)).await {
        Err(TransportError::Status(status)) => {
            assert_eq!(status.code(), tonic::Code::ResourceExhausted)
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(greeter.served(), 2);
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn two_endpoints_ten_rps() -> anyhow::Result<()> {
    init();
    let (greeter, port) = mock(mock_delay(0)).await?;
    let dir = tempfile::tempdir()?;
    let urls = url_file(dir.path(), &["127.0.0.1", "127.0.0.1\teventing"])?;

    let report = InvokerRuntime::new()
        .url_file(&urls)
        .output_dir(dir.path())
        .config(config(10, 2, port)?)
        .run()
        .await?;

    let stats = &report.stats;
    assert!((19..=21).contains(&stats.issued), "issued {}", stats.issued);
    assert!(stats.completed_at_deadline <= stats.issued);
    assert_eq!(stats.completed, stats.issued);
    assert_eq!(stats.failed, 0);
    assert!(
        (stats.achieved_rps - 10.).abs() <= 1.,
        "achieved {}",
        stats.achieved_rps
    );
    assert_eq!(greeter.served(), stats.completed);

    let expected_name = output_file_name(stats.achieved_rps, "lat.csv");
    assert_eq!(report.latency_file, dir.path().join(&expected_name));
    assert!(expected_name.starts_with("rps") && expected_name.ends_with("_lat.csv"));

    let contents = std::fs::read_to_string(&report.latency_file)?;
    assert!(contents.ends_with('\n'));
    let latencies: Vec<u64> = contents
        .lines()
        .map(str::parse)
        .collect::<Result<_, _>>()?;
    assert_eq!(latencies.len() as u64, stats.completed);
    assert!(latencies.iter().all(|micros| *micros > 0));
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn rejected_calls_are_measured() -> anyhow::Result<()> {
    init();
    let greeter = mock_delay(1).limited(NonZeroU32::new(2).unwrap());
    let (greeter, port) = mock(greeter).await?;
    let endpoints = EndpointSet::new(vec![Endpoint::serving("127.0.0.1")])?;

    let stats = run_benchmark(endpoints, GrpcTransport::new(), config(20, 1, port)?).await?;

    assert_eq!(stats.completed, stats.issued);
    assert!(stats.failed > 0 && stats.failed < stats.completed);
    assert_eq!(stats.latencies.len() as u64, stats.completed);
    assert_eq!(greeter.served(), stats.completed);
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn slow_endpoint_times_out() -> anyhow::Result<()> {
    init();
    let (_greeter, port) = mock(mock_delay(3_000)).await?;
    let endpoints = EndpointSet::new(vec![Endpoint::serving("127.0.0.1")])?;
    let config = config(2, 1, port)?.call_timeout(Duration::from_secs(1));

    let stats = run_benchmark(endpoints, GrpcTransport::new(), config).await?;

    assert_eq!(stats.issued, 2);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.failed, 2);
    assert!(stats
        .latencies
        .iter()
        .all(|latency| *latency >= Duration::from_secs(1)));
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn immediate_drain_reports_before_slow_calls_finish() -> anyhow::Result<()> {
    init();
    let (greeter, port) = mock(mock_delay(1_500)).await?;
    let endpoints = EndpointSet::new(vec![Endpoint::serving("127.0.0.1")])?;
    let config = config(1, 2, port)?.drain(DrainPolicy::Immediate);

    let stats = run_benchmark(endpoints, GrpcTransport::new(), config).await?;

    assert_eq!(stats.issued, 2);
    assert!(stats.completed_at_deadline <= 1);
    assert!(stats.latencies.len() <= 1);
    assert!(stats.achieved_rps <= 0.5 + f64::EPSILON);

    // The detached call still reaches the server.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(greeter.served(), 2);
    Ok(())
}
