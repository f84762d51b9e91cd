//! Stop signals delivered to the test process.
//!
//! Kept in its own test binary: the signal reaches every listener in the
//! process.

#![cfg(unix)]

use std::process::Command;
use std::time::Duration;

use graceful::lifecycle::{run, RunConfig, Scope};
use tokio::signal::unix::SignalKind;

mod common;

use common::{CleanupLog, MockService};

fn send_to_self(signal: &str) {
    let status = Command::new("kill")
        .args([signal, &std::process::id().to_string()])
        .status()
        .expect("kill available");
    assert!(status.success());
}

#[tokio::test]
async fn test_sigterm_triggers_graceful_shutdown() {
    let service = MockService::well_behaved();
    let log = CleanupLog::default();
    let config = RunConfig::new().cleanup(log.cleanup("close-db"));

    let run_service = service.clone();
    let handle = tokio::spawn(async move { run(&Scope::new(), run_service, config).await });

    // Give `run` time to register its handlers.
    tokio::time::sleep(Duration::from_millis(100)).await;

    send_to_self("-TERM");

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("run did not finish in time")
        .unwrap();
    assert!(result.is_ok(), "got {result:?}");
    assert_eq!(service.shutdown_calls(), 1);
    assert_eq!(log.entries(), vec!["close-db"]);
}

#[tokio::test]
async fn test_configured_signal_triggers_graceful_shutdown() {
    let service = MockService::well_behaved();
    let log = CleanupLog::default();
    let config = RunConfig::new()
        .signals([SignalKind::user_defined1()])
        .cleanup(log.cleanup("flush"));

    let run_service = service.clone();
    let handle = tokio::spawn(async move { run(&Scope::new(), run_service, config).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    send_to_self("-USR1");

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("run did not finish in time")
        .unwrap();
    assert!(result.is_ok(), "got {result:?}");
    assert_eq!(service.shutdown_calls(), 1);
    assert_eq!(log.entries(), vec!["flush"]);
}
