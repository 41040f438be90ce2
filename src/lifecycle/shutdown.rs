//! Shutdown coordination for a single server.
//!
//! `GracefulShutdown` runs a server's accept loop on a background task and
//! races its result against the signal stream. The first event decides the
//! outcome: a serve failure is returned as is, a qualifying signal triggers
//! exactly one graceful stop whose result is returned.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::config::ShutdownConfig;
use crate::lifecycle::context::ShutdownContext;
use crate::lifecycle::signals::{Signal, SignalSet, SignalStream};
use crate::server::Server;

/// Error from a run that owns its OS signal registration.
#[derive(Debug)]
pub enum RunError<E> {
    /// Failed to install signal handlers; the server was never started.
    Signals(std::io::Error),
    /// Reported by the server, either from serving or from stopping.
    Server(E),
}

impl<E: fmt::Display> fmt::Display for RunError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Signals(e) => write!(f, "Failed to register signal handlers: {}", e),
            RunError::Server(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RunError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Signals(e) => Some(e),
            RunError::Server(e) => e.source(),
        }
    }
}

/// Coordinator for graceful shutdown of one server.
#[derive(Debug, Clone, Default)]
pub struct GracefulShutdown {
    /// Signals that request shutdown.
    signals: SignalSet,
    /// Bound on the graceful stop phase. `None` waits indefinitely.
    timeout: Option<Duration>,
}

impl GracefulShutdown {
    pub fn new(signals: SignalSet, timeout: Option<Duration>) -> Self {
        Self { signals, timeout }
    }

    pub fn from_config(config: &ShutdownConfig) -> Self {
        Self::new(SignalSet::new(config.signals.iter().copied()), config.timeout())
    }

    pub fn signals(&self) -> &SignalSet {
        &self.signals
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Serve until `server` fails or a qualifying signal arrives on `signals`.
    ///
    /// Returns the serve error in the first case and the graceful stop result
    /// in the second. Signals outside the allow-list are discarded. A serve
    /// that returns `Ok(())` on its own does not end the run.
    pub async fn listen_and_serve<S: Server>(
        &self,
        server: Arc<S>,
        mut signals: SignalStream,
    ) -> Result<(), S::Error> {
        let (failed_tx, mut failed_rx) = oneshot::channel::<S::Error>();
        let mut serving = {
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                if let Err(err) = server.serve().await {
                    let _ = failed_tx.send(err);
                }
            })
        };

        tracing::info!(
            timeout_ms = self.timeout.map(|t| t.as_millis() as u64),
            "Serving until shutdown signal"
        );

        let mut serve_pending = true;
        let mut stream_open = true;
        let signal = loop {
            tokio::select! {
                failed = &mut failed_rx, if serve_pending => {
                    serve_pending = false;
                    match failed {
                        Ok(err) => {
                            tracing::error!(error = %err, "Server failed, shutdown not attempted");
                            return Err(err);
                        }
                        Err(_) => match (&mut serving).await {
                            Err(join_err) if join_err.is_panic() => {
                                std::panic::resume_unwind(join_err.into_panic());
                            }
                            _ => tracing::debug!("Server returned without error, waiting for shutdown signal"),
                        },
                    }
                }
                received = signals.recv(), if stream_open => match received {
                    Some(signal) if self.signals.is_shutdown_signal(signal) => break signal,
                    Some(_) => {}
                    None => {
                        stream_open = false;
                        tracing::warn!("Signal stream closed, shutdown can no longer be requested");
                    }
                },
                else => std::future::pending::<()>().await,
            }
        };

        tracing::info!(signal = %signal, "Shutdown signal received, stopping server");
        let started = Instant::now();
        let ctx = ShutdownContext::from_timeout(self.timeout);
        let result = server.graceful_stop(ctx.clone()).await;
        ctx.cancel();

        match &result {
            Ok(()) => tracing::info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Server stopped gracefully"
            ),
            Err(err) => tracing::warn!(
                error = %err,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Graceful stop failed"
            ),
        }
        result
    }

    /// Like [`listen_and_serve`](Self::listen_and_serve), registering OS
    /// handlers for the allow-list first.
    ///
    /// `extra` names further signals to intercept and ignore. They lose their
    /// default action for the rest of the process, so pass them only when
    /// that is wanted.
    pub async fn listen_and_serve_os<S: Server>(
        &self,
        server: Arc<S>,
        extra: &[Signal],
    ) -> Result<(), RunError<S::Error>> {
        let stream = SignalStream::register(&self.watched(extra)).map_err(RunError::Signals)?;
        self.listen_and_serve(server, stream)
            .await
            .map_err(RunError::Server)
    }

    fn watched(&self, extra: &[Signal]) -> Vec<Signal> {
        let mut watched: Vec<Signal> = self.signals.iter().collect();
        watched.sort_by_key(|signal| signal.name());
        for &signal in extra {
            if !watched.contains(&signal) {
                watched.push(signal);
            }
        }
        watched
    }
}

/// Serve `server` until SIGINT or SIGTERM, then stop it within `timeout`.
///
/// Only SIGINT and SIGTERM get OS handlers; every other signal keeps its
/// default action.
pub async fn listen_and_serve<S: Server>(
    server: Arc<S>,
    timeout: Option<Duration>,
) -> Result<(), RunError<S::Error>> {
    GracefulShutdown::new(SignalSet::default(), timeout)
        .listen_and_serve_os(server, &[])
        .await
}
