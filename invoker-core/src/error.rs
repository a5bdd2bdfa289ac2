use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors which stop a run before the first request is dispatched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to read endpoint file {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to read endpoints: {0}")]
    Read(#[source] std::io::Error),

    #[error("Malformed endpoint on line {line}: {content:?}")]
    Malformed { line: usize, content: String },

    #[error("No endpoints to invoke")]
    NoEndpoints,

    #[error("Run duration must be at least one second, got {0:?}")]
    InvalidDuration(Duration),
}
