//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check the allow-list is non-empty and can be intercepted
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::AppConfig;
use crate::lifecycle::signals::Signal;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("server.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("shutdown.timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("shutdown.signals must not be empty")]
    NoShutdownSignals,

    #[error("shutdown signal {0} cannot be intercepted by a process")]
    UninterceptableSignal(Signal),
}

/// Check `config` for semantic errors, reporting every one found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.server.bind_address.clone()));
    }

    if config.shutdown.timeout_ms == Some(0) {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.shutdown.signals.is_empty() {
        errors.push(ValidationError::NoShutdownSignals);
    }

    for &signal in &config.shutdown.signals {
        if !signal.is_interceptable() {
            errors.push(ValidationError::UninterceptableSignal(signal));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_error() {
        let mut config = AppConfig::default();
        config.server.bind_address = "localhost".to_string();
        config.shutdown.timeout_ms = Some(0);
        config.shutdown.signals = vec![Signal::Kill, Signal::Quit];
        config.shutdown.watch = vec![Signal::Interrupt];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::BindAddress("localhost".to_string()),
                ValidationError::ZeroTimeout,
                ValidationError::UninterceptableSignal(Signal::Kill),
            ]
        );
    }

    #[test]
    fn allow_list_need_not_repeat_in_watch() {
        let mut config = AppConfig::default();
        config.shutdown.signals = vec![Signal::Quit];
        config.shutdown.watch = vec![Signal::Hangup];
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn empty_allow_list_is_rejected() {
        let mut config = AppConfig::default();
        config.shutdown.signals.clear();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::NoShutdownSignals])
        );
    }
}
