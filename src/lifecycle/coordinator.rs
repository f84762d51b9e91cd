//! Run a service from start to cleanup.
//!
//! ```text
//! Starting → Running → {Failed, CancelReceived}
//! CancelReceived → ShuttingDown → {ShutdownOk, ShutdownFailed}
//! ShutdownOk | ShutdownFailed → CleaningUp → Terminated
//! ```
//!
//! A service that fails before a stop is requested gets neither a shutdown
//! nor cleanups.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use crate::config::ShutdownConfig;
use crate::lifecycle::cleanup::{run_cleanups, Cleanup};
use crate::lifecycle::error::RunError;
use crate::lifecycle::runner;
use crate::lifecycle::scope::Scope;
use crate::lifecycle::service::Service;
use crate::lifecycle::shutdown::{self, effective_timeout};
use crate::lifecycle::signals::{self, StopSignals};
use crate::observability::metrics;

/// Options for a single run. The default is valid: a 5 second shutdown
/// timeout, no cleanups, and SIGINT/SIGTERM as stop signals for [`run`].
#[derive(Default)]
pub struct RunConfig {
    shutdown_timeout: Option<Duration>,
    cleanups: Vec<Cleanup>,
    signals: StopSignals,
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound on `Service::shutdown`. Zero selects the default.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// Append a cleanup. Cleanups run in the order they were added.
    pub fn cleanup(mut self, cleanup: Cleanup) -> Self {
        self.cleanups.push(cleanup);
        self
    }

    /// Append a cleanup action.
    pub fn on_cleanup<F>(self, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.cleanup(Cleanup::new(action))
    }

    /// Signals that stop a [`run`]. Ignored by [`run_until`].
    pub fn stop_signals(mut self, signals: StopSignals) -> Self {
        self.signals = signals;
        self
    }

    /// Stop a [`run`] on any of `kinds` instead of SIGINT/SIGTERM.
    #[cfg(unix)]
    pub fn signals(
        self,
        kinds: impl IntoIterator<Item = tokio::signal::unix::SignalKind>,
    ) -> Self {
        self.stop_signals(StopSignals::new(kinds))
    }

    /// The timeout `Service::shutdown` will be given.
    pub fn effective_shutdown_timeout(&self) -> Duration {
        effective_timeout(self.shutdown_timeout)
    }

    /// Build from the `[shutdown]` configuration section.
    pub fn from_config(config: &ShutdownConfig) -> Self {
        Self {
            shutdown_timeout: Some(config.timeout()),
            ..Self::default()
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("cleanups", &self.cleanups)
            .field("signals", &self.signals)
            .finish()
    }
}

/// Run `service` until a stop signal or until `parent` is cancelled.
///
/// The stop signals (SIGINT/SIGTERM unless configured otherwise) are watched
/// for the duration of the call. Their handlers stay registered afterwards,
/// so those signals no longer terminate the process once `run` returns.
/// See [`run_until`] for the shutdown and cleanup semantics.
pub async fn run<S>(parent: &Scope, service: Arc<S>, config: RunConfig) -> Result<(), RunError>
where
    S: Service + ?Sized,
{
    let signals = signals::listen(parent, &config.signals).map_err(RunError::Signals)?;
    run_until(signals.scope(), service, config).await
}

/// Run `service` until `scope` is done.
///
/// - A failure from `serve` before `scope` is done is returned immediately.
/// - If `serve` returns cleanly before `scope` is done, `Ok(())` is returned
///   immediately.
/// - Otherwise the service is shut down within the configured timeout, its
///   outcome is drained and the cleanups run in order. A service failure
///   takes priority over a shutdown failure.
///
/// # Panics
///
/// Re-raises the first panic from a cleanup after all cleanups have run.
pub async fn run_until<S>(
    scope: &Scope,
    service: Arc<S>,
    config: RunConfig,
) -> Result<(), RunError>
where
    S: Service + ?Sized,
{
    let name = service.name().to_owned();
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!(
        parent: scope.span(),
        "graceful_run",
        service = %name,
        run_id = %run_id,
    );

    let result = coordinate(scope, service, config).instrument(span).await;

    let outcome = match &result {
        Ok(()) => "stopped",
        Err(err) => err.outcome(),
    };
    metrics::record_run(&name, outcome);
    result
}

async fn coordinate<S>(scope: &Scope, service: Arc<S>, config: RunConfig) -> Result<(), RunError>
where
    S: Service + ?Sized,
{
    let RunConfig {
        shutdown_timeout,
        cleanups,
        ..
    } = config;

    let (mut outcome, task) = runner::spawn(Arc::clone(&service));
    tracing::info!("Service running");

    tokio::select! {
        failure = outcome.recv() => {
            return match failure {
                Some(err) => {
                    tracing::error!(error = %err, "Service failed before shutdown was requested");
                    Err(err)
                }
                None => {
                    tracing::warn!("Service stopped before shutdown was requested");
                    Ok(())
                }
            };
        }
        _ = scope.done() => {
            tracing::info!("Stop requested");
        }
    }

    let timeout = effective_timeout(shutdown_timeout);
    let report = shutdown::drive(service.as_ref(), scope, timeout, &mut outcome, task).await;

    tracing::debug!(count = cleanups.len(), "Running cleanups");
    run_cleanups(cleanups);

    let result = report.into_result();
    match &result {
        Ok(()) => tracing::info!("Service stopped"),
        Err(err) => tracing::warn!(error = %err, "Service stopped with error"),
    }
    result
}
