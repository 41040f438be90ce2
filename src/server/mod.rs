//! Server abstraction driven by the shutdown orchestrator.
//!
//! # Data Flow
//! ```text
//! GracefulShutdown::listen_and_serve
//!     → Server::serve (background task, runs until stopped or failed)
//!     → qualifying signal
//!     → Server::graceful_stop(ShutdownContext) (stop accepting, drain, honour deadline)
//! ```
//!
//! # Design Decisions
//! - The orchestrator only borrows the server for one run; it never owns its lifecycle
//! - Errors stay the server's own type so callers see them verbatim
//! - `http.rs` provides the axum-backed implementation used by the binary

use std::future::Future;

use crate::lifecycle::ShutdownContext;

pub mod http;

pub use http::{HttpServer, HttpServerError};

/// Something that accepts work until told to stop.
pub trait Server: Send + Sync + 'static {
    /// Error reported by either phase.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Accept work until stopped. Returns `Err` if serving failed.
    fn serve(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Stop accepting new work and wait for in-flight work, bounded by `ctx`.
    fn graceful_stop(
        &self,
        ctx: ShutdownContext,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
