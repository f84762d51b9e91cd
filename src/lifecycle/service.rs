//! The capability the coordinator requires of a long-running service.

use async_trait::async_trait;

use crate::lifecycle::scope::Scope;

/// Error type returned by service implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A long-running service driven by the lifecycle coordinator.
///
/// `serve` blocks until the service stops. Returning `Ok(())` means the
/// service stopped because [`Service::shutdown`] asked it to; any `Err`
/// is treated as a startup or runtime failure.
///
/// `shutdown` must cause an in-flight `serve` call to return `Ok(())` and
/// should itself return before `scope` is done.
#[async_trait]
pub trait Service
where
    Self: Send + Sync + 'static,
{
    /// Name used in logs, metrics and errors.
    fn name(&self) -> &str;

    /// Serve until stopped.
    async fn serve(&self) -> Result<(), BoxError>;

    /// Stop serving, finishing in-flight work within `scope`.
    async fn shutdown(&self, scope: &Scope) -> Result<(), BoxError>;
}
