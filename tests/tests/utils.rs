use mock_service::MockGreeter;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        let _ = FmtSubscriber::builder()
            .with_env_filter("invoker=debug,invoker_runtime=debug,mock_service=debug")
            .try_init();
    });
}

/// Start a greeter on an ephemeral port and return it along with the port.
#[allow(unused)]
pub async fn mock(greeter: MockGreeter) -> anyhow::Result<(MockGreeter, u16)> {
    let addr = mock_service::spawn(greeter.clone()).await?;
    // Give the server a moment to start accepting.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok((greeter, addr.port()))
}

#[allow(unused)]
pub fn mock_delay(delay_ms: u64) -> MockGreeter {
    MockGreeter::new(Duration::from_millis(delay_ms))
}

/// Write an endpoint file into `dir`.
#[allow(unused)]
pub fn url_file(dir: &Path, lines: &[&str]) -> anyhow::Result<PathBuf> {
    let path = dir.join("urls.txt");
    let mut contents = lines.join("\n");
    contents.push('\n');
    std::fs::write(&path, contents)?;
    Ok(path)
}
