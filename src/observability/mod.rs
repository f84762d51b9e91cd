//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle events:
//!     → logging.rs (structured log events on the run span)
//!     → metrics.rs (run outcomes, shutdown durations, cleanup panics)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Every run carries a `run_id` span field
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
