//! Bounded shutdown of a running service.
//!
//! # Data Flow
//! ```text
//! stop requested
//!     → bounded scope (parent values + span, fresh token, deadline)
//!     → Service::shutdown under tokio::time::timeout
//!     → drain the service outcome until the deadline
//!     → service failure wins over shutdown failure
//! ```

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::lifecycle::error::RunError;
use crate::lifecycle::handoff::Slot;
use crate::lifecycle::scope::Scope;
use crate::lifecycle::service::Service;
use crate::observability::metrics;

/// Shutdown timeout used when none is configured.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolve a configured timeout, falling back to the default when unset or zero.
pub fn effective_timeout(configured: Option<Duration>) -> Duration {
    match configured {
        Some(timeout) if !timeout.is_zero() => timeout,
        _ => DEFAULT_SHUTDOWN_TIMEOUT,
    }
}

/// Result of a shutdown, before the two failures are ranked.
#[derive(Debug)]
pub(crate) struct ShutdownReport {
    /// Failure drained from the service after shutdown.
    pub service: Option<RunError>,
    /// Result of `Service::shutdown`.
    pub shutdown: Result<(), RunError>,
}

impl ShutdownReport {
    /// Collapse into the run result. A service failure takes priority.
    pub fn into_result(self) -> Result<(), RunError> {
        match self.service {
            Some(err) => Err(err),
            None => self.shutdown,
        }
    }
}

/// Stop `service` within `timeout`, then drain its outcome.
///
/// `scope` is the (already cancelled) run scope; only its values and span
/// carry over into the bounded scope handed to `Service::shutdown`.
pub(crate) async fn drive<S>(
    service: &S,
    scope: &Scope,
    timeout: Duration,
    outcome: &mut Slot<RunError>,
    task: JoinHandle<()>,
) -> ShutdownReport
where
    S: Service + ?Sized,
{
    let name = service.name();
    let started = Instant::now();
    let deadline = started + timeout;
    let bounded = scope.without_cancel().with_timeout(timeout);

    tracing::info!(timeout_ms = timeout.as_millis() as u64, "Shutting down service");

    let shutdown = match tokio::time::timeout_at(deadline, service.shutdown(&bounded)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => {
            tracing::warn!(error = %source, "Service shutdown failed");
            Err(RunError::ShutdownFailed {
                service: name.to_owned(),
                source,
            })
        }
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Service shutdown timed out");
            Err(RunError::ShutdownTimedOut {
                service: name.to_owned(),
                timeout,
            })
        }
    };

    // A failure may have raced with the stop request; it must not be lost.
    // Past the deadline this is a presence check only.
    let service_failure = match tokio::time::timeout_at(deadline, outcome.recv()).await {
        Ok(failure) => failure,
        Err(_) => {
            tracing::warn!("Service still running after shutdown deadline, aborting its task");
            task.abort();
            outcome.try_recv()
        }
    };

    if let Some(err) = &service_failure {
        tracing::error!(error = %err, "Service failed during shutdown");
    }

    metrics::record_shutdown(name, started.elapsed(), shutdown.is_ok());

    ShutdownReport {
        service: service_failure,
        shutdown,
    }
}
