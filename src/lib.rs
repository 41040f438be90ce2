//! Graceful shutdown for long-running network servers.
//!
//! Runs a server's accept loop in the background and stops it gracefully,
//! within an optional deadline, when the process receives a shutdown signal.

pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod server;

pub use config::AppConfig;
pub use lifecycle::{listen_and_serve, GracefulShutdown, RunError, ShutdownContext, Signal, SignalSet, SignalStream};
pub use server::{HttpServer, Server};
