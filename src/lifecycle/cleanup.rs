//! Post-shutdown cleanup sequencing.
//!
//! # Responsibilities
//! - Run cleanup actions strictly in order
//! - Keep running the remaining actions when one panics
//! - Re-raise the first panic once every action has run
//!
//! # Design Decisions
//! - A panicking cleanup is a programming error, so it stays a panic
//!   rather than becoming a `RunError`
//! - Later panics are logged and dropped; only the first payload survives

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::lifecycle::error::panic_message;
use crate::observability::metrics;

/// A zero-argument action run after the service has shut down.
pub struct Cleanup {
    name: Option<String>,
    action: Box<dyn FnOnce() + Send>,
}

impl Cleanup {
    /// Wrap an action.
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            name: None,
            action: Box::new(action),
        }
    }

    /// Wrap an action with a name used in logs.
    pub fn named<F>(name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            name: Some(name.into()),
            action: Box::new(action),
        }
    }

    /// Name of this cleanup, if one was given.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleanup").field("name", &self.name).finish()
    }
}

/// Run every cleanup in order.
///
/// # Panics
///
/// Re-raises the first panic raised by a cleanup, after all cleanups have
/// run.
pub fn run_cleanups(cleanups: Vec<Cleanup>) {
    let mut first_panic: Option<Box<dyn Any + Send>> = None;

    for (index, cleanup) in cleanups.into_iter().enumerate() {
        let name = cleanup.name.as_deref().unwrap_or("unnamed").to_owned();
        tracing::debug!(cleanup = %name, index, "Running cleanup");

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(cleanup.action)) {
            metrics::record_cleanup_panic();
            tracing::error!(
                cleanup = %name,
                index,
                panic = %panic_message(payload.as_ref()),
                "Cleanup panicked"
            );
            if first_panic.is_none() {
                first_panic = Some(payload);
            }
        }
    }

    if let Some(payload) = first_panic {
        panic::resume_unwind(payload);
    }
}
