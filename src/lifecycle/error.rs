//! Errors returned by a coordinated run.

use std::time::Duration;

use thiserror::Error;

use crate::lifecycle::service::BoxError;

/// Terminal failure of a coordinated run.
///
/// A panicking cleanup is not represented here: it is re-raised as a panic
/// once every cleanup has run.
#[derive(Debug, Error)]
pub enum RunError {
    /// `serve` returned an error.
    #[error("service `{service}` failed: {source}")]
    Service {
        service: String,
        #[source]
        source: BoxError,
    },

    /// `serve` panicked.
    #[error("service `{service}` panicked: {message}")]
    ServicePanicked { service: String, message: String },

    /// `shutdown` did not return within the shutdown timeout.
    #[error("shutdown of `{service}` timed out after {timeout:?}")]
    ShutdownTimedOut { service: String, timeout: Duration },

    /// `shutdown` returned an error.
    #[error("shutdown of `{service}` failed: {source}")]
    ShutdownFailed {
        service: String,
        #[source]
        source: BoxError,
    },

    /// Signal handlers could not be installed.
    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),
}

impl RunError {
    /// The service failed to start or crashed while running.
    pub fn is_service_failure(&self) -> bool {
        matches!(self, Self::Service { .. } | Self::ServicePanicked { .. })
    }

    /// The bounded shutdown did not complete cleanly.
    pub fn is_shutdown_failure(&self) -> bool {
        matches!(self, Self::ShutdownTimedOut { .. } | Self::ShutdownFailed { .. })
    }

    /// Name of the service the error relates to.
    pub fn service(&self) -> Option<&str> {
        match self {
            Self::Service { service, .. }
            | Self::ServicePanicked { service, .. }
            | Self::ShutdownTimedOut { service, .. }
            | Self::ShutdownFailed { service, .. } => Some(service.as_str()),
            Self::Signals(_) => None,
        }
    }

    /// Label used for the `outcome` metric.
    pub(crate) fn outcome(&self) -> &'static str {
        if self.is_service_failure() {
            "service_failed"
        } else if self.is_shutdown_failure() {
            "shutdown_failed"
        } else {
            "error"
        }
    }
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
