use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use invoker::grpc::{HelloReply, HelloRequest, GREETER_SERVICE, SAY_HELLO_PATH};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::{
    num::NonZeroU32,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::codec::ProstCodec;
use tonic::codegen::{empty_body, http, Body, BoxFuture, Context, Poll, Service, StdError};
use tonic::server::{Grpc, NamedService, UnaryService};
use tonic::transport::Server;
use tracing::{debug, error};

/// `helloworld.Greeter` which answers after a fixed delay.
///
/// With a limit set, requests above the limit are answered with `RESOURCE_EXHAUSTED` instead.
#[derive(Clone)]
pub struct MockGreeter {
    delay: Duration,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
    served: Arc<AtomicU64>,
    traced: Arc<AtomicU64>,
}

impl MockGreeter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            limiter: None,
            served: Arc::new(AtomicU64::new(0)),
            traced: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn limited(mut self, max_rps: NonZeroU32) -> Self {
        self.limiter = Some(Arc::new(rate_limiter(max_rps)));
        self
    }

    /// Requests received so far, including rejected ones.
    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    /// Requests which carried a W3C `traceparent` header.
    pub fn traced(&self) -> u64 {
        self.traced.load(Ordering::Relaxed)
    }

    async fn say_hello(&self, request: HelloRequest) -> Result<HelloReply, tonic::Status> {
        self.served.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(self.delay).await;

        if let Some(limiter) = &self.limiter {
            if limiter.check().is_err() {
                debug!("MOCK SERVER ___ LIMITED");
                return Err(tonic::Status::resource_exhausted("rate limited"));
            }
        }

        Ok(HelloReply {
            message: format!("Hello {}", request.name),
        })
    }
}

const TRACEPARENT: &str = "traceparent";

struct SayHello(MockGreeter);

impl UnaryService<HelloRequest> for SayHello {
    type Response = HelloReply;
    type Future = BoxFuture<tonic::Response<HelloReply>, tonic::Status>;

    fn call(&mut self, request: tonic::Request<HelloRequest>) -> Self::Future {
        let greeter = self.0.clone();
        if request.metadata().contains_key(TRACEPARENT) {
            greeter.traced.fetch_add(1, Ordering::Relaxed);
        }
        Box::pin(async move {
            greeter
                .say_hello(request.into_inner())
                .await
                .map(tonic::Response::new)
        })
    }
}

impl<B> Service<http::Request<B>> for MockGreeter
where
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        match req.uri().path() {
            SAY_HELLO_PATH => {
                let method = SayHello(self.clone());
                Box::pin(async move {
                    let codec: ProstCodec<HelloReply, HelloRequest> = ProstCodec::default();
                    let mut grpc = Grpc::new(codec);
                    Ok(grpc.unary(method, req).await)
                })
            }
            _ => Box::pin(async move {
                let mut response = http::Response::new(empty_body());
                let headers = response.headers_mut();
                headers.insert(
                    "grpc-status",
                    http::HeaderValue::from(tonic::Code::Unimplemented as i32),
                );
                headers.insert(
                    http::header::CONTENT_TYPE,
                    http::HeaderValue::from_static("application/grpc"),
                );
                Ok(response)
            }),
        }
    }
}

impl NamedService for MockGreeter {
    const NAME: &'static str = GREETER_SERVICE;
}

/// Serve `greeter` on `addr` until the process exits.
pub async fn run(addr: SocketAddr, greeter: MockGreeter) -> Result<(), tonic::transport::Error> {
    Server::builder().add_service(greeter).serve(addr).await
}

/// Serve `greeter` on an ephemeral localhost port in the background and return the bound address.
pub async fn spawn(greeter: MockGreeter) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let res = Server::builder()
            .add_service(greeter)
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await;
        if let Err(err) = res {
            error!("Mock service stopped: {err}");
        }
    });

    Ok(addr)
}

/** Utils **/

pub fn rate_limiter(max_rps: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(max_rps))
}

/** TPS Printer **/

pub async fn tps_measure_task(greeter: MockGreeter) {
    let mut last = 0;
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let served = greeter.served();
        println!("{} TPS", served - last);
        last = served;
    }
}
