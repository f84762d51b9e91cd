//! Service runner.
//!
//! # Responsibilities
//! - Launch `Service::serve` on its own task, once per run
//! - Classify its result: `Ok(())` is a clean stop, anything else a failure
//! - Hand a failure to the coordinator through a single-slot handoff

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::lifecycle::error::{panic_message, RunError};
use crate::lifecycle::handoff::{self, Slot};
use crate::lifecycle::service::Service;

/// Spawn `service.serve()` on a new task.
///
/// The returned slot yields the failure, if any, and is finalized without a
/// value when the service stops cleanly.
pub(crate) fn spawn<S>(service: Arc<S>) -> (Slot<RunError>, JoinHandle<()>)
where
    S: Service + ?Sized,
{
    let (tx, slot) = handoff::channel();

    let task = async move {
        let name = service.name().to_owned();
        tracing::debug!("Service starting");

        match AssertUnwindSafe(service.serve()).catch_unwind().await {
            Ok(Ok(())) => {
                tracing::debug!("Service stopped cleanly");
                tx.close();
            }
            Ok(Err(source)) => {
                tracing::error!(error = %source, "Service failed");
                tx.send(RunError::Service {
                    service: name,
                    source,
                });
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(panic = %message, "Service panicked");
                tx.send(RunError::ServicePanicked {
                    service: name,
                    message,
                });
            }
        }
    };

    let handle = tokio::spawn(task.in_current_span());
    (slot, handle)
}
