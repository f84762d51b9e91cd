//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Run (coordinator.rs):
//!     runner.rs spawns Service::serve → handoff.rs slot
//!     → wait for { service failure | scope done }
//!     → shutdown.rs bounded stop + drain
//!     → cleanup.rs ordered cleanups
//!
//! Signals (signals.rs):
//!     configured stop signals (SIGINT/SIGTERM) → cancel the run scope
//! ```
//!
//! # Design Decisions
//! - One service task per run; the coordinator keeps no state between runs
//! - Shutdown has a deadline independent of the stop request
//! - A service failure is never dropped, even when it races a stop request
//! - Cleanups always all run; the first panic is re-raised afterwards

pub mod cleanup;
pub mod coordinator;
pub mod error;
pub mod handoff;
mod runner;
pub mod scope;
pub mod service;
pub mod shutdown;
pub mod signals;

pub use cleanup::{run_cleanups, Cleanup};
pub use coordinator::{run, run_until, RunConfig};
pub use error::RunError;
pub use scope::Scope;
pub use service::{BoxError, Service};
pub use shutdown::DEFAULT_SHUTDOWN_TIMEOUT;
pub use signals::{listen, SignalScope, StopSignals};
