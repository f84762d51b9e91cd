//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for a configurable set of stop signals (SIGINT and
//!   SIGTERM by default, Ctrl-C on non-unix platforms)
//! - Translate the first stop signal into cancellation of a [`Scope`]
//!
//! # Design Decisions
//! - Handlers are registered before the watcher is spawned, so a signal
//!   delivered right after `listen` returns is not missed
//! - The watcher stops when its [`SignalScope`] is dropped
//! - Handlers stay installed for the life of the process once registered;
//!   tokio cannot restore the default disposition

#[cfg(unix)]
use tokio::signal::unix::SignalKind;
use tokio::task::JoinHandle;

use crate::lifecycle::scope::Scope;

/// The set of OS signals that request a stop.
///
/// Defaults to SIGINT and SIGTERM. On non-unix platforms only Ctrl-C is
/// supported and the set is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopSignals {
    #[cfg(unix)]
    kinds: Vec<SignalKind>,
}

impl StopSignals {
    /// Stop on any of `kinds`. An empty set never fires.
    #[cfg(unix)]
    pub fn new(kinds: impl IntoIterator<Item = SignalKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    #[cfg(unix)]
    pub fn kinds(&self) -> &[SignalKind] {
        &self.kinds
    }
}

impl Default for StopSignals {
    fn default() -> Self {
        #[cfg(unix)]
        {
            Self::new([SignalKind::interrupt(), SignalKind::terminate()])
        }
        #[cfg(not(unix))]
        {
            Self {}
        }
    }
}

#[cfg(unix)]
struct UnixSignals {
    handlers: Vec<(SignalKind, tokio::signal::unix::Signal)>,
}

#[cfg(unix)]
impl UnixSignals {
    fn register(signals: &StopSignals) -> std::io::Result<Self> {
        let handlers = signals
            .kinds()
            .iter()
            .map(|&kind| tokio::signal::unix::signal(kind).map(|handler| (kind, handler)))
            .collect::<std::io::Result<_>>()?;
        Ok(Self { handlers })
    }

    async fn recv(&mut self) -> SignalKind {
        std::future::poll_fn(|cx| {
            for (kind, handler) in self.handlers.iter_mut() {
                if handler.poll_recv(cx).is_ready() {
                    return std::task::Poll::Ready(*kind);
                }
            }
            std::task::Poll::Pending
        })
        .await
    }
}

/// A scope cancelled by the parent scope or by a stop signal.
///
/// Dropping it stops the watcher. The signal handlers themselves remain
/// registered, so the listened signals no longer terminate the process
/// afterwards.
#[derive(Debug)]
pub struct SignalScope {
    scope: Scope,
    watcher: JoinHandle<()>,
}

impl SignalScope {
    /// The signal-aware scope.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl Drop for SignalScope {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

/// Derive a child of `parent` that is cancelled on any of `signals`.
#[cfg(unix)]
pub fn listen(parent: &Scope, signals: &StopSignals) -> std::io::Result<SignalScope> {
    let mut handlers = UnixSignals::register(signals)?;
    let scope = parent.child();
    let target = scope.clone();

    let watcher = tokio::spawn(async move {
        tokio::select! {
            kind = handlers.recv() => {
                tracing::info!(signal = kind.as_raw_value(), "Received stop signal");
                target.cancel();
            }
            _ = target.token().cancelled() => {}
        }
    });

    Ok(SignalScope { scope, watcher })
}

/// Derive a child of `parent` that is cancelled on Ctrl-C.
#[cfg(not(unix))]
pub fn listen(parent: &Scope, _signals: &StopSignals) -> std::io::Result<SignalScope> {
    let scope = parent.child();
    let target = scope.clone();

    let watcher = tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    tracing::info!(signal = "ctrl-c", "Received stop signal");
                    target.cancel();
                }
                Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
            },
            _ = target.token().cancelled() => {}
        }
    });

    Ok(SignalScope { scope, watcher })
}
