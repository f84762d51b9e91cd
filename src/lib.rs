//! Graceful start/stop/cleanup coordination for long-running services.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::GracefulConfig;
pub use http::HttpService;
pub use lifecycle::{run, run_until, Cleanup, RunConfig, RunError, Scope, Service};
