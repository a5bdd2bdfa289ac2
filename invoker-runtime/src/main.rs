use invoker_runtime::{logging, InvokerRuntime};
use tracing::error;

#[tokio::main]
async fn main() {
    let runtime = InvokerRuntime::new().with_args();
    logging::init(runtime.debug(), runtime.zipkin_endpoint());

    let res = runtime.run().await;
    if let Err(err) = tokio::task::spawn_blocking(logging::shutdown).await {
        error!("Trace exporter shutdown failed: {err}");
    }

    if let Err(err) = res {
        error!("{err}");
        std::process::exit(1);
    }
}
