//! Shared utilities for lifecycle integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use graceful::lifecycle::{BoxError, Cleanup, Scope, Service};
use tokio_util::sync::CancellationToken;

/// How `serve` behaves.
#[derive(Debug, Clone)]
pub enum Serve {
    /// Block until `shutdown` is called, then return `Ok(())`.
    UntilStopped,
    /// Return an error immediately.
    FailImmediately(&'static str),
    /// Return an error as soon as `trigger` is cancelled.
    FailWhen(CancellationToken, &'static str),
    /// Return `Ok(())` immediately.
    ExitImmediately,
    /// Panic immediately.
    Panic(&'static str),
}

/// How `shutdown` behaves.
#[derive(Debug, Clone)]
pub enum Shutdown {
    /// Stop `serve` and return `Ok(())`.
    Stop,
    /// Ignore the scope and sleep, then stop.
    Hang(Duration),
    /// Stop `serve` and return an error.
    Fail(&'static str),
}

/// A service whose `serve` and `shutdown` are scripted by the test.
pub struct MockService {
    serve: Serve,
    shutdown: Shutdown,
    stop: CancellationToken,
    serve_calls: AtomicUsize,
    shutdown_calls: AtomicUsize,
    shutdown_deadline: Mutex<Option<Duration>>,
}

impl MockService {
    pub fn new(serve: Serve, shutdown: Shutdown) -> Arc<Self> {
        Arc::new(Self {
            serve,
            shutdown,
            stop: CancellationToken::new(),
            serve_calls: AtomicUsize::new(0),
            shutdown_calls: AtomicUsize::new(0),
            shutdown_deadline: Mutex::new(None),
        })
    }

    pub fn well_behaved() -> Arc<Self> {
        Self::new(Serve::UntilStopped, Shutdown::Stop)
    }

    pub fn serve_calls(&self) -> usize {
        self.serve_calls.load(Ordering::SeqCst)
    }

    pub fn shutdown_calls(&self) -> usize {
        self.shutdown_calls.load(Ordering::SeqCst)
    }

    /// Time the shutdown scope had left when `shutdown` was entered.
    pub fn shutdown_budget(&self) -> Option<Duration> {
        *self.shutdown_deadline.lock().unwrap()
    }
}

#[async_trait]
impl Service for MockService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn serve(&self) -> Result<(), BoxError> {
        self.serve_calls.fetch_add(1, Ordering::SeqCst);
        match &self.serve {
            Serve::UntilStopped => {
                self.stop.cancelled().await;
                Ok(())
            }
            Serve::FailImmediately(message) => Err((*message).into()),
            Serve::FailWhen(trigger, message) => {
                trigger.cancelled().await;
                Err((*message).into())
            }
            Serve::ExitImmediately => Ok(()),
            Serve::Panic(message) => panic!("{message}"),
        }
    }

    async fn shutdown(&self, scope: &Scope) -> Result<(), BoxError> {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        *self.shutdown_deadline.lock().unwrap() = scope.remaining();
        assert!(!scope.is_cancelled(), "shutdown scope must not start cancelled");

        match &self.shutdown {
            Shutdown::Stop => {
                self.stop.cancel();
                Ok(())
            }
            Shutdown::Hang(duration) => {
                tokio::time::sleep(*duration).await;
                self.stop.cancel();
                Ok(())
            }
            Shutdown::Fail(message) => {
                self.stop.cancel();
                Err((*message).into())
            }
        }
    }
}

/// Shared log the cleanups write into.
#[derive(Clone, Default)]
pub struct CleanupLog(Arc<Mutex<Vec<&'static str>>>);

impl CleanupLog {
    pub fn cleanup(&self, name: &'static str) -> Cleanup {
        let log = self.clone();
        Cleanup::named(name, move || log.0.lock().unwrap().push(name))
    }

    pub fn entries(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

/// Poll `addr` until it accepts TCP connections.
pub async fn wait_for_listener(addr: std::net::SocketAddr) {
    for _ in 0..100 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("{addr} never started listening");
}
