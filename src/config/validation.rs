//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and log level before anything is started
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GracefulConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

use crate::config::schema::GracefulConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),

    #[error("observability.log_level `{0}` is not a log level")]
    LogLevel(String),
}

/// Check a parsed configuration.
pub fn validate_config(config: &GracefulConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if LevelFilter::from_str(&observability.log_level).is_err() {
        errors.push(ValidationError::LogLevel(observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
