//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use graceful_shutdown::lifecycle::SignalSender;
use graceful_shutdown::{GracefulShutdown, Server, ShutdownContext, SignalStream};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type ServeFn = Box<dyn Fn() -> BoxFuture<Result<(), MockError>> + Send + Sync>;
type StopFn = Box<dyn Fn(ShutdownContext) -> BoxFuture<Result<(), MockError>> + Send + Sync>;

/// Error returned by the mock server's closures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MockError(pub &'static str);

/// A server whose behaviour is supplied by swappable closures.
///
/// By default `serve` never returns and `graceful_stop` succeeds at once.
pub struct MockServer {
    serve_fn: ServeFn,
    stop_fn: StopFn,
    serve_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    stop_called: Notify,
}

impl MockServer {
    pub fn new() -> Self {
        Self {
            serve_fn: Box::new(|| Box::pin(std::future::pending())),
            stop_fn: Box::new(|_| Box::pin(async { Ok(()) })),
            serve_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            stop_called: Notify::new(),
        }
    }

    pub fn on_serve<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), MockError>> + Send + 'static,
    {
        self.serve_fn = Box::new(move || Box::pin(f()));
        self
    }

    pub fn on_stop<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ShutdownContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), MockError>> + Send + 'static,
    {
        self.stop_fn = Box::new(move |ctx| Box::pin(f(ctx)));
        self
    }

    pub fn serve_calls(&self) -> usize {
        self.serve_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// Fails the test unless `graceful_stop` is called within 500ms.
    pub async fn assert_stop_called(&self) {
        tokio::time::timeout(Duration::from_millis(500), self.stop_called.notified())
            .await
            .expect("timeout waiting for graceful_stop to be called");
    }

    /// Fails the test if `graceful_stop` has been called, after letting the run settle.
    pub async fn assert_stop_not_called(&self) {
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(self.stop_calls(), 0, "expected graceful_stop not to be called");
    }
}

impl Server for MockServer {
    type Error = MockError;

    fn serve(&self) -> impl Future<Output = Result<(), MockError>> + Send {
        self.serve_calls.fetch_add(1, Ordering::SeqCst);
        (self.serve_fn)()
    }

    fn graceful_stop(
        &self,
        ctx: ShutdownContext,
    ) -> impl Future<Output = Result<(), MockError>> + Send {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.stop_called.notify_one();
        (self.stop_fn)(ctx)
    }
}

/// Start a run against an injected signal stream.
pub fn start<S: Server>(
    shutdown: GracefulShutdown,
    server: Arc<S>,
) -> (SignalSender, JoinHandle<Result<(), S::Error>>) {
    let (signals, stream) = SignalStream::channel(16);
    let run = tokio::spawn(async move { shutdown.listen_and_serve(server, stream).await });
    (signals, run)
}

/// Await the run's outcome, failing the test if it takes longer than 500ms.
pub async fn outcome<E: Send + 'static>(run: JoinHandle<Result<(), E>>) -> Result<(), E> {
    tokio::time::timeout(Duration::from_millis(500), run)
        .await
        .expect("timeout waiting for the run to finish")
        .expect("run task panicked")
}

/// Poll `addr` until something accepts connections.
pub async fn wait_for_listen(addr: SocketAddr) {
    for _ in 0..20 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("timeout waiting for server to listen on {addr}");
}
