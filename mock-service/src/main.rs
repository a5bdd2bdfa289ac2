use mock_service::{run, tps_measure_task, MockGreeter};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_ADDR: &str = "0.0.0.0:50051";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new("mock_service=debug"))
        .init();

    let addr: SocketAddr = std::env::args()
        .nth(1)
        .as_deref()
        .unwrap_or(DEFAULT_ADDR)
        .parse()?;

    let greeter = MockGreeter::new(Duration::from_millis(1));
    tokio::task::spawn(tps_measure_task(greeter.clone()));

    run(addr, greeter).await?;
    Ok(())
}
