//! HTTP service adapter.
//!
//! # Responsibilities
//! - Serve an Axum router as a lifecycle [`Service`]
//! - Bind lazily so bind failures surface as startup failures
//! - Stop accepting on shutdown and drain in-flight connections
//!
//! # Design Decisions
//! - `serve` returns `Ok(())` only after a requested shutdown
//! - Shutdown waits for connections to drain, bounded by the scope it is given
//! - A service serves at most once
//! - `serve` after a requested shutdown is a clean stop, even if shutdown
//!   won the race for the listener

use std::net::SocketAddr;
use std::sync::OnceLock;

use async_trait::async_trait;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::{BoxError, Scope, Service};

/// Errors reported by [`HttpService`].
#[derive(Debug, Error)]
pub enum HttpServiceError {
    /// Binding the listener failed.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The server loop stopped with an IO error.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    /// `serve` was called more than once.
    #[error("service was already started")]
    AlreadyStarted,

    /// In-flight connections did not finish before the shutdown deadline.
    #[error("connections still open at shutdown deadline")]
    DrainTimedOut,
}

enum Bind {
    Address(String),
    Listener(TcpListener),
}

/// An Axum router served as a lifecycle service.
pub struct HttpService {
    name: String,
    router: Router,
    bind: Mutex<Option<Bind>>,
    local_addr: OnceLock<SocketAddr>,
    shutdown: CancellationToken,
    stopped: CancellationToken,
}

impl HttpService {
    /// Serve `router` on `address`, binding when the service starts.
    pub fn new(name: impl Into<String>, address: impl Into<String>, router: Router) -> Self {
        Self::with_bind(name.into(), Bind::Address(address.into()), router, OnceLock::new())
    }

    /// Serve `router` on an already bound listener.
    pub fn from_listener(
        name: impl Into<String>,
        listener: TcpListener,
        router: Router,
    ) -> std::io::Result<Self> {
        let local_addr = OnceLock::new();
        let _ = local_addr.set(listener.local_addr()?);
        Ok(Self::with_bind(name.into(), Bind::Listener(listener), router, local_addr))
    }

    fn with_bind(name: String, bind: Bind, router: Router, local_addr: OnceLock<SocketAddr>) -> Self {
        Self {
            name,
            router,
            bind: Mutex::new(Some(bind)),
            local_addr,
            shutdown: CancellationToken::new(),
            stopped: CancellationToken::new(),
        }
    }

    /// Address the service is listening on, once bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Take the listener, binding it if needed. `None` when shutdown was
    /// requested before the service started.
    async fn listener(&self) -> Result<Option<TcpListener>, HttpServiceError> {
        let bind = match self.bind.lock().await.take() {
            Some(bind) => bind,
            None if self.shutdown.is_cancelled() => return Ok(None),
            None => return Err(HttpServiceError::AlreadyStarted),
        };

        let listener = match bind {
            Bind::Listener(listener) => listener,
            Bind::Address(address) => {
                let bound = TcpListener::bind(address.as_str()).await;
                bound.map_err(|source| HttpServiceError::Bind { address, source })?
            }
        };

        if let Ok(addr) = listener.local_addr() {
            let _ = self.local_addr.set(addr);
        }
        Ok(Some(listener))
    }
}

#[async_trait]
impl Service for HttpService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn serve(&self) -> Result<(), BoxError> {
        let Some(listener) = self.listener().await? else {
            tracing::info!("HTTP server stopped before it started");
            return Ok(());
        };
        tracing::info!(address = ?self.local_addr(), "HTTP server listening");

        let app = self
            .router
            .clone()
            .into_make_service_with_connect_info::<SocketAddr>();

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(self.shutdown.clone().cancelled_owned())
            .await;

        self.stopped.cancel();
        tracing::info!("HTTP server stopped");
        result.map_err(|e| HttpServiceError::Serve(e).into())
    }

    async fn shutdown(&self, scope: &Scope) -> Result<(), BoxError> {
        self.shutdown.cancel();

        // Never started: drop the listener so the address is released.
        if self.bind.lock().await.take().is_some() {
            self.stopped.cancel();
            return Ok(());
        }

        tokio::select! {
            _ = self.stopped.cancelled() => Ok(()),
            _ = scope.done() => Err(HttpServiceError::DrainTimedOut.into()),
        }
    }
}
