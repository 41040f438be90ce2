//! graceful-shutdown
//!
//! Runs a small HTTP server under the shutdown orchestrator.
//!
//! ```text
//!   SIGINT/SIGTERM ──▶ SignalStream ──▶ GracefulShutdown ──▶ HttpServer::graceful_stop
//!                                             │
//!                                             └── spawns ──▶ HttpServer::serve (axum)
//! ```
//!
//! `GET /` answers immediately, `GET /slow` answers after the configured
//! delay, so in-flight requests can be observed draining during shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use graceful_shutdown::config::{load_config, validate_config, AppConfig, ConfigError};
use graceful_shutdown::observability::init_logging;
use graceful_shutdown::{GracefulShutdown, HttpServer};

#[derive(Parser)]
#[command(name = "graceful-shutdown")]
#[command(about = "HTTP server that drains in-flight requests on SIGINT/SIGTERM", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override server.bind_address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override shutdown.timeout_ms.
    #[arg(long)]
    shutdown_timeout_ms: Option<u64>,

    /// Override server.slow_response_ms.
    #[arg(long)]
    slow_response_ms: Option<u64>,
}

impl Cli {
    fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => AppConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config.server.bind_address = bind.clone();
        }
        if let Some(timeout_ms) = self.shutdown_timeout_ms {
            config.shutdown.timeout_ms = Some(timeout_ms);
        }
        if let Some(slow_response_ms) = self.slow_response_ms {
            config.server.slow_response_ms = slow_response_ms;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load()?;

    init_logging(&config.logging)?;

    tracing::info!(
        bind_address = %config.server.bind_address,
        shutdown_timeout_ms = config.shutdown.timeout_ms,
        shutdown_signals = ?config.shutdown.signals,
        "Configuration loaded"
    );

    let shutdown = GracefulShutdown::from_config(&config.shutdown);
    let server = Arc::new(HttpServer::new(config.server.clone()));

    if let Err(err) = shutdown
        .listen_and_serve_os(server, &config.shutdown.watch)
        .await
    {
        tracing::error!(error = %err, "Server exited with error");
        return Err(err.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
