//! Open-loop, fixed-rate RPC load generator.
//!
//! A [`Driver`] ticks at the target rate, spawns one invocation per tick round-robin over an
//! [`invoker_core::EndpointSet`], and reports achieved throughput and per-call latencies.

pub mod driver;
pub mod grpc;
pub mod latency;
pub mod output;
pub mod task;
pub mod transport;

mod timer;

pub use driver::{run_benchmark, Driver};
pub use grpc::GrpcTransport;
pub use latency::{Collector, LatencyStore, Recorder};
pub use output::{output_file_name, write_latencies, OutputError};
pub use transport::{Transport, TransportError};

#[doc(hidden)]
pub use invoker_core as core;
