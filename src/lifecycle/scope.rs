//! Cancellable execution scopes.
//!
//! A [`Scope`] pairs a cancellation token with an optional deadline and the
//! ambient context a run carries along: a tracing span and typed values.
//!
//! # Design Decisions
//! - Cancellation is one-shot and flows from parent to child only
//! - `without_cancel` keeps the ambient context but detaches cancellation,
//!   so a shutdown bound is not cut short by the stop request that started it
//! - The deadline is checked lazily by `done()` and `is_cancelled()`

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Span;

type Values = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// A cancellable scope carrying a deadline, a tracing span and typed values.
#[derive(Clone)]
pub struct Scope {
    token: CancellationToken,
    deadline: Option<Instant>,
    values: Arc<Values>,
    span: Span,
}

impl Scope {
    /// Create a root scope attached to the current span.
    pub fn new() -> Self {
        Self::from_token(CancellationToken::new())
    }

    /// Create a root scope driven by an existing token.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
            values: Arc::new(Values::new()),
            span: Span::current(),
        }
    }

    /// Replace the span carried by this scope.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Attach a typed value. A value of the same type is replaced.
    pub fn with_value<T>(mut self, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.values).insert(TypeId::of::<T>(), Arc::new(value));
        self
    }

    /// Look up a typed value.
    pub fn value<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// The span carried by this scope.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// The underlying cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Derive a scope that is cancelled together with this one.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            values: Arc::clone(&self.values),
            span: self.span.clone(),
        }
    }

    /// Derive a scope that shares values and span but not cancellation.
    ///
    /// The new scope has its own token and no deadline, so it is live even
    /// when this scope has already been cancelled.
    pub fn without_cancel(&self) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            values: Arc::clone(&self.values),
            span: self.span.clone(),
        }
    }

    /// Derive a child scope that is done after `timeout` at the latest.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let mut child = self.child();
        child.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        child
    }

    /// Cancel this scope and all of its children.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the scope was cancelled or its deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Deadline of this scope, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline. Zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Wait until the scope is cancelled or its deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("cancelled", &self.token.is_cancelled())
            .field("deadline", &self.deadline)
            .field("values", &self.values.len())
            .finish()
    }
}
