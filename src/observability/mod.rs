//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! lifecycle + server subsystems emit tracing events
//!     → logging.rs (EnvFilter + fmt layer)
//!     → stdout
//! ```
//!
//! # Design Decisions
//! - Structured fields instead of formatted messages
//! - Ignored signals are never logged; only state transitions are

pub mod logging;

pub use logging::init_logging;
