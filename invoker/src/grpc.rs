//! `helloworld.Greeter/SayHello` over tonic.
//!
//! Messages are declared by hand with `prost` derives so the crate builds without `protoc`.
use crate::transport::{Transport, TransportError};
use opentelemetry::global;
use opentelemetry::propagation::Injector;
use std::time::Duration;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue};
use tonic::transport::Endpoint;
use tracing::{info_span, warn, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub const GREETER_SERVICE: &str = "helloworld.Greeter";
pub const SAY_HELLO_PATH: &str = "/helloworld.Greeter/SayHello";

/// Name sent with every request.
pub const DEFAULT_NAME: &str = "faas";

#[derive(Clone, PartialEq, prost::Message)]
pub struct HelloRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HelloReply {
    #[prost(string, tag = "1")]
    pub message: String,
}

/// Dials a fresh connection per call, so connection setup is part of every measured latency.
#[derive(Clone, Debug)]
pub struct GrpcTransport {
    name: String,
    tracing: bool,
}

impl Default for GrpcTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl GrpcTransport {
    pub fn new() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            tracing: false,
        }
    }

    /// Wrap every call in an `rpc` span carrying the target address, and propagate its trace
    /// context to the callee in the request metadata.
    pub fn with_tracing(mut self, tracing: bool) -> Self {
        self.tracing = tracing;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    async fn say_hello(&self, address: &str, timeout: Duration) -> Result<(), TransportError> {
        let channel = Endpoint::from_shared(address.to_string())?
            .connect_timeout(timeout)
            .timeout(timeout)
            .connect()
            .await?;

        let mut grpc = tonic::client::Grpc::new(channel);
        grpc.ready().await?;

        let codec: ProstCodec<HelloRequest, HelloReply> = ProstCodec::default();
        let mut request = tonic::Request::new(HelloRequest {
            name: self.name.clone(),
        });
        if self.tracing {
            inject_trace_context(request.metadata_mut());
        }
        grpc.unary(request, PathAndQuery::from_static(SAY_HELLO_PATH), codec)
            .await?;

        Ok(())
    }
}

struct MetadataInjector<'a>(&'a mut MetadataMap);

impl Injector for MetadataInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        match (
            MetadataKey::<Ascii>::from_bytes(key.as_bytes()),
            value.parse::<MetadataValue<Ascii>>(),
        ) {
            (Ok(key), Ok(value)) => {
                self.0.insert(key, value);
            }
            _ => warn!("Skipping unrepresentable trace header {key}"),
        }
    }
}

/// Write the current span's context into `metadata` with the global propagator.
pub(crate) fn inject_trace_context(metadata: &mut MetadataMap) {
    let context = tracing::Span::current().context();
    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(&context, &mut MetadataInjector(metadata))
    });
}

impl Transport for GrpcTransport {
    async fn call(&self, address: &str, timeout: Duration) -> Result<(), TransportError> {
        if self.tracing {
            self.say_hello(address, timeout)
                .instrument(info_span!("rpc", %address))
                .await
        } else {
            self.say_hello(address, timeout).await
        }
    }
}
