use invoker::OutputError;
use invoker_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Unable to persist latencies: {0}")]
    Output(#[from] OutputError),
}
