use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("remote error: {0}")]
    Status(#[from] tonic::Status),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),
}

/// A single unary request/response against `address`.
///
/// Implementations should respect `timeout`; the caller additionally cuts the call off once it
/// elapses.
pub trait Transport: Send + Sync + 'static {
    fn call(
        &self,
        address: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
