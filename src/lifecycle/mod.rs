//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     OS handlers (or a synthetic sender) → SignalStream
//!
//! Shutdown (shutdown.rs):
//!     Spawn Server::serve → race serve failure against SignalStream
//!     → non-qualifying signal: discard, keep waiting
//!     → qualifying signal: Server::graceful_stop(ShutdownContext)
//!
//! Context (context.rs):
//!     Optional shutdown timeout → deadline bounding graceful_stop
//! ```
//!
//! # Design Decisions
//! - First event wins; exactly one terminal outcome per run
//! - Shutdown has timeout: the server decides what happens at the deadline
//! - No retries and no error wrapping; the server's error is returned as is

pub mod context;
pub mod shutdown;
pub mod signals;

pub use context::{ContextError, DeadlineExceeded, ShutdownContext};
pub use shutdown::{listen_and_serve, GracefulShutdown, RunError};
pub use signals::{Signal, SignalSender, SignalSet, SignalStream};
