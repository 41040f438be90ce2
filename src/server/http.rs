//! HTTP server setup and graceful stop.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing)
//! - Bind to the configured address when serving starts
//! - Stop accepting on request and drain in-flight requests
//! - Report a missed shutdown deadline as a distinct error

use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use axum::{extract::State, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::lifecycle::{ContextError, DeadlineExceeded, ShutdownContext};
use crate::server::Server;

/// Error type for HTTP server operations.
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("Graceful stop did not finish: {0}")]
    DeadlineExceeded(#[from] DeadlineExceeded),

    #[error("Graceful stop was cancelled before requests drained")]
    Cancelled,
}

/// Application state injected into handlers.
#[derive(Clone)]
struct AppState {
    slow_response: Duration,
}

/// Axum server that can be stopped gracefully.
pub struct HttpServer {
    config: ServerConfig,
    /// Cancelled to stop accepting connections.
    stop: CancellationToken,
    /// `true` while `serve` is accepting or draining.
    running: watch::Sender<bool>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        let (running, _) = watch::channel(false);
        Self {
            config,
            stop: CancellationToken::new(),
            running,
            local_addr: Mutex::new(None),
        }
    }

    /// Address the server is bound to, once serving.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.lock().ok().and_then(|addr| *addr)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn build_router(&self) -> Router {
        let state = AppState {
            slow_response: self.config.slow_response(),
        };

        Router::new()
            .route("/", get(hello_handler))
            .route("/slow", get(slow_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    async fn run(&self) -> Result<(), HttpServerError> {
        if self.stop.is_cancelled() {
            tracing::info!("HTTP server stopped before binding");
            return Ok(());
        }

        let listener = TcpListener::bind(&self.config.bind_address)
            .await
            .map_err(|source| HttpServerError::Bind {
                address: self.config.bind_address.clone(),
                source,
            })?;
        let addr = listener.local_addr().map_err(HttpServerError::Serve)?;
        if let Ok(mut local_addr) = self.local_addr.lock() {
            *local_addr = Some(addr);
        }

        tracing::info!(address = %addr, "HTTP server listening");

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(self.stop.clone().cancelled_owned())
            .await
            .map_err(HttpServerError::Serve)?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

impl Server for HttpServer {
    type Error = HttpServerError;

    async fn serve(&self) -> Result<(), HttpServerError> {
        self.running.send_replace(true);
        let result = self.run().await;
        self.running.send_replace(false);
        result
    }

    async fn graceful_stop(&self, ctx: ShutdownContext) -> Result<(), HttpServerError> {
        self.stop.cancel();

        let mut running = self.running.subscribe();
        tokio::select! {
            _ = async {
                let _ = running.wait_for(|running| !*running).await;
            } => Ok(()),
            _ = ctx.cancelled() => match ctx.check() {
                Err(ContextError::DeadlineExceeded(err)) => {
                    tracing::warn!("Shutdown deadline reached with requests still in flight");
                    Err(err.into())
                }
                _ => {
                    tracing::warn!("Shutdown cancelled with requests still in flight");
                    Err(HttpServerError::Cancelled)
                }
            }
        }
    }
}

async fn hello_handler() -> &'static str {
    "hello"
}

async fn slow_handler(State(state): State<AppState>) -> &'static str {
    tokio::time::sleep(state.slow_response).await;
    "hello"
}
