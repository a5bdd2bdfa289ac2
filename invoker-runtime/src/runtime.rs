//! Default command line runtime.
//!
//! Reads endpoints from a file, runs the driver with the gRPC transport, and persists the
//! measured latencies next to the achieved rate.
use crate::error::RuntimeError;
use clap::{Parser, ValueEnum};
use invoker::{write_latencies, Driver, GrpcTransport};
use invoker_core::{
    DrainPolicy, EndpointSet, RunConfig, RunStatistics, DEFAULT_CALL_TIMEOUT, DEFAULT_DURATION,
    DEFAULT_PORT, DEFAULT_RPS,
};
use std::ffi::OsString;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, instrument};

const DEFAULT_URL_FILE: &str = "urls.txt";
const DEFAULT_OUTPUT_FILE: &str = "lat.csv";
const DEFAULT_ZIPKIN: &str = "http://localhost:9411/api/v2/spans";

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Drain {
    /// Wait for every in-flight call before writing latencies
    Wait,
    /// Write latencies as soon as the run ends
    Immediate,
}

impl From<Drain> for DrainPolicy {
    fn from(drain: Drain) -> Self {
        match drain {
            Drain::Wait => DrainPolicy::WaitForAll,
            Drain::Immediate => DrainPolicy::Immediate,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "invoker", version, about = "Fixed-rate gRPC load generator")]
struct InvokerCli {
    /// File with the functions' URLs, one per line, optionally tagged `\teventing`
    #[arg(long = "url-file", alias = "urlFile", default_value = DEFAULT_URL_FILE)]
    url_file: PathBuf,

    /// Target requests per second
    #[arg(long, default_value_t = DEFAULT_RPS)]
    rps: NonZeroU32,

    /// Run the benchmark for this many seconds
    #[arg(
        long,
        default_value_t = DEFAULT_DURATION.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    time: u64,

    /// CSV file for the latency measurements in microseconds
    #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
    latf: String,

    /// Directory the latency file is written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// The port that functions listen to
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Trace every call and export the spans to the Zipkin collector
    #[arg(long)]
    trace: bool,

    /// Zipkin collector endpoint used with `--trace`
    #[arg(long, default_value = DEFAULT_ZIPKIN)]
    zipkin: String,

    /// Enable debug logging
    #[arg(long)]
    dbg: bool,

    /// What to do with calls still in flight when the run ends
    #[arg(long, value_enum, default_value_t = Drain::Wait)]
    drain: Drain,

    /// Per-call timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CALL_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout: u64,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct Report {
    pub stats: RunStatistics,
    pub latency_file: PathBuf,
}

/// Command line runtime.
///
/// # Example
///
/// ```no_run
/// use invoker_runtime::InvokerRuntime;
///
/// #[tokio::main]
/// async fn main() {
///     let runtime = InvokerRuntime::new().with_args();
///     if let Err(err) = runtime.run().await {
///         eprintln!("{err}");
///         std::process::exit(1);
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct InvokerRuntime {
    url_file: PathBuf,
    output_file: String,
    output_dir: PathBuf,
    zipkin: String,
    debug: bool,
    config: RunConfig,
}

impl Default for InvokerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl InvokerRuntime {
    pub fn new() -> Self {
        Self {
            url_file: PathBuf::from(DEFAULT_URL_FILE),
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            output_dir: PathBuf::from("."),
            zipkin: DEFAULT_ZIPKIN.to_string(),
            debug: false,
            config: RunConfig::default(),
        }
    }

    /// Use the process arguments.
    ///
    /// `--url-file`, `--rps`, `--time`, `--latf`, `--out-dir`, `--port`, `--trace`, `--zipkin`,
    /// `--dbg`, `--drain`, `--timeout`. Exits with usage on invalid arguments.
    ///
    /// ```ignore
    /// $ invoker --url-file urls.txt --rps 100 --time 60 --port 50051
    /// ```
    pub fn with_args(self) -> Self {
        self.apply(InvokerCli::parse())
    }

    /// Like [`Self::with_args`] but from an explicit argument list, without exiting.
    pub fn try_with_args_from<I, T>(self, args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(self.apply(InvokerCli::try_parse_from(args)?))
    }

    fn apply(mut self, args: InvokerCli) -> Self {
        self.url_file = args.url_file;
        self.output_file = args.latf;
        self.output_dir = args.out_dir;
        self.zipkin = args.zipkin;
        self.debug = args.dbg;
        self.config = RunConfig {
            target_rps: args.rps,
            duration: Duration::from_secs(args.time),
            port: args.port,
            tracing: args.trace,
            drain: args.drain.into(),
            call_timeout: Duration::from_secs(args.timeout),
        };
        self
    }

    pub fn url_file(mut self, url_file: impl Into<PathBuf>) -> Self {
        self.url_file = url_file.into();
        self
    }

    pub fn output_file(mut self, output_file: impl Into<String>) -> Self {
        self.output_file = output_file.into();
        self
    }

    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn zipkin(mut self, zipkin: impl Into<String>) -> Self {
        self.zipkin = zipkin.into();
        self
    }

    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn tracing(&self) -> bool {
        self.config.tracing
    }

    /// Collector to export spans to, set only when tracing is on.
    pub fn zipkin_endpoint(&self) -> Option<&str> {
        self.tracing().then_some(self.zipkin.as_str())
    }

    #[instrument(name = "invoker", skip_all, fields(url_file = %self.url_file.display()))]
    pub async fn run(self) -> Result<Report, RuntimeError> {
        info!("Reading the URLs from the file: {}", self.url_file.display());
        let endpoints = EndpointSet::from_path(&self.url_file)?;

        let transport = GrpcTransport::new().with_tracing(self.config.tracing);
        let stats = Driver::new(endpoints, transport, self.config)?.run().await;

        let latency_file = write_latencies(
            &self.output_dir,
            stats.achieved_rps,
            &self.output_file,
            &stats.latencies,
        )?;

        Ok(Report {
            stats,
            latency_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invoker_core::ConfigError;
    use std::net::TcpListener;

    fn parse(args: &[&str]) -> Result<InvokerRuntime, clap::Error> {
        InvokerRuntime::new().try_with_args_from(std::iter::once("invoker").chain(args.iter().copied()))
    }

    #[test]
    fn cli_defaults() {
        let runtime = parse(&[]).unwrap();
        assert_eq!(runtime.url_file, PathBuf::from("urls.txt"));
        assert_eq!(runtime.output_file, "lat.csv");
        assert_eq!(runtime.config.target_rps.get(), 1);
        assert_eq!(runtime.config.duration, Duration::from_secs(5));
        assert_eq!(runtime.config.port, 80);
        assert_eq!(runtime.config.drain, DrainPolicy::WaitForAll);
        assert_eq!(runtime.config.call_timeout, Duration::from_secs(30));
        assert!(!runtime.tracing());
        assert!(!runtime.debug());
        assert_eq!(runtime.zipkin, "http://localhost:9411/api/v2/spans");
        assert_eq!(runtime.zipkin_endpoint(), None);
    }

    #[test]
    fn cli_flags() {
        let runtime = parse(&[
            "--urlFile",
            "fns.txt",
            "--rps",
            "250",
            "--time",
            "60",
            "--latf",
            "out.csv",
            "--port",
            "50051",
            "--trace",
            "--zipkin",
            "http://zipkin.monitoring:9411/api/v2/spans",
            "--dbg",
            "--drain",
            "immediate",
        ])
        .unwrap();

        assert_eq!(runtime.url_file, PathBuf::from("fns.txt"));
        assert_eq!(runtime.output_file, "out.csv");
        assert_eq!(runtime.config.target_rps.get(), 250);
        assert_eq!(runtime.config.duration, Duration::from_secs(60));
        assert_eq!(runtime.config.port, 50051);
        assert_eq!(runtime.config.drain, DrainPolicy::Immediate);
        assert!(runtime.tracing());
        assert!(runtime.debug());
        assert_eq!(
            runtime.zipkin_endpoint(),
            Some("http://zipkin.monitoring:9411/api/v2/spans")
        );
    }

    #[test]
    fn zipkin_without_trace_is_inert() {
        let runtime = parse(&["--zipkin", "http://zipkin:9411/api/v2/spans"]).unwrap();
        assert_eq!(runtime.zipkin, "http://zipkin:9411/api/v2/spans");
        assert_eq!(runtime.zipkin_endpoint(), None);
    }

    #[test]
    fn cli_rejects_zero_rate_and_duration() {
        assert!(parse(&["--rps", "0"]).is_err());
        assert!(parse(&["--time", "0"]).is_err());
        assert!(parse(&["--timeout", "0"]).is_err());
    }

    #[tokio::test]
    async fn missing_url_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let res = InvokerRuntime::new()
            .url_file(dir.path().join("urls.txt"))
            .output_dir(dir.path())
            .run()
            .await;

        assert!(matches!(
            res,
            Err(RuntimeError::Config(ConfigError::Unreadable { .. }))
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn malformed_url_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let urls = dir.path().join("urls.txt");
        std::fs::write(&urls, "127.0.0.1\teventing\textra\n").unwrap();

        let res = InvokerRuntime::new()
            .url_file(&urls)
            .output_dir(dir.path())
            .run()
            .await;

        assert!(matches!(
            res,
            Err(RuntimeError::Config(ConfigError::Malformed { line: 1, .. }))
        ));
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn unreachable_endpoints_are_still_measured() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let dir = tempfile::tempdir().unwrap();
        let urls = dir.path().join("urls.txt");
        std::fs::write(&urls, "127.0.0.1\n127.0.0.1\teventing\n").unwrap();

        let config = RunConfig::new(NonZeroU32::new(5).unwrap(), Duration::from_secs(1))
            .unwrap()
            .port(port)
            .call_timeout(Duration::from_secs(5));
        let report = InvokerRuntime::new()
            .url_file(&urls)
            .output_dir(dir.path())
            .config(config)
            .run()
            .await
            .unwrap();

        let stats = &report.stats;
        assert!(stats.issued >= 4 && stats.issued <= 6, "issued {}", stats.issued);
        assert_eq!(stats.completed, stats.issued);
        assert_eq!(stats.failed, stats.completed);

        let contents = std::fs::read_to_string(&report.latency_file).unwrap();
        assert_eq!(contents.lines().count() as u64, stats.completed);
        assert!(contents.lines().all(|line| line.parse::<u64>().is_ok()));
        assert!(logs_contain("Reading the URLs from the file"));
    }
}
