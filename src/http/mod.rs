//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! coordinator
//!     → server.rs (HttpService::serve binds and runs axum)
//!     → stop requested: HttpService::shutdown stops accepting, drains
//!     → serve returns Ok(()) once connections are closed
//! ```

pub mod server;

pub use server::{HttpService, HttpServiceError};
