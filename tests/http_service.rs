//! The axum service adapter driven by the coordinator.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use graceful::http::{HttpService, HttpServiceError};
use graceful::lifecycle::{run_until, RunConfig, RunError, Scope};
use tokio::net::TcpListener;

mod common;

use common::CleanupLog;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

async fn bound_service(router: Router) -> Arc<HttpService> {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    Arc::new(HttpService::from_listener("http-test", listener, router).unwrap())
}

fn ping_router() -> Router {
    Router::new().route("/ping", get(|| async { "pong" }))
}

#[tokio::test]
async fn test_serves_requests_until_stopped() {
    let service = bound_service(ping_router()).await;
    let addr = service.local_addr().unwrap();
    let log = CleanupLog::default();
    let config = RunConfig::new().cleanup(log.cleanup("close-db"));

    let scope = Scope::new();
    let run_scope = scope.clone();
    let run_service = service.clone();
    let handle = tokio::spawn(async move { run_until(&run_scope, run_service, config).await });

    let res = reqwest::get(format!("http://{}/ping", addr))
        .await
        .expect("server unreachable");
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "pong");

    scope.cancel();
    let result = tokio::time::timeout(TEST_TIMEOUT, handle)
        .await
        .expect("run did not finish in time")
        .unwrap();
    assert!(result.is_ok(), "got {result:?}");
    assert_eq!(log.entries(), vec!["close-db"]);
}

#[tokio::test]
async fn test_cancelled_before_start_is_a_clean_stop() {
    let service = bound_service(ping_router()).await;
    let log = CleanupLog::default();
    let config = RunConfig::new().cleanup(log.cleanup("close-db"));

    let scope = Scope::new();
    scope.cancel();

    let result = tokio::time::timeout(TEST_TIMEOUT, run_until(&scope, service, config))
        .await
        .expect("run did not finish in time");
    assert!(result.is_ok(), "got {result:?}");
    assert_eq!(log.entries(), vec!["close-db"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_immediate_cancel_is_a_clean_stop() {
    for _ in 0..50 {
        let service = bound_service(ping_router()).await;
        let scope = Scope::new();
        let run_scope = scope.clone();
        let handle =
            tokio::spawn(async move { run_until(&run_scope, service, RunConfig::new()).await });
        scope.cancel();

        let result = tokio::time::timeout(TEST_TIMEOUT, handle)
            .await
            .expect("run did not finish in time")
            .unwrap();
        assert!(result.is_ok(), "got {result:?}");
    }
}

#[tokio::test]
async fn test_lazy_bind_serves_on_address() {
    let reserved = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = reserved.local_addr().unwrap();
    drop(reserved);

    let service = Arc::new(HttpService::new("http-test", addr.to_string(), ping_router()));
    let scope = Scope::new();
    let run_scope = scope.clone();
    let run_service = service.clone();
    let handle =
        tokio::spawn(async move { run_until(&run_scope, run_service, RunConfig::new()).await });

    common::wait_for_listener(addr).await;
    assert_eq!(service.local_addr(), Some(addr));

    scope.cancel();
    tokio::time::timeout(TEST_TIMEOUT, handle)
        .await
        .expect("run did not finish in time")
        .unwrap()
        .expect("clean stop");
}

#[tokio::test]
async fn test_bind_failure_is_a_startup_failure() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = taken.local_addr().unwrap().to_string();

    let service = Arc::new(HttpService::new("http-test", address, ping_router()));
    let log = CleanupLog::default();
    let config = RunConfig::new().cleanup(log.cleanup("close-db"));

    let err = run_until(&Scope::new(), service, config).await.unwrap_err();

    match &err {
        RunError::Service { source, .. } => assert!(matches!(
            source.downcast_ref::<HttpServiceError>(),
            Some(HttpServiceError::Bind { .. })
        )),
        other => panic!("unexpected error: {other}"),
    }
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn test_in_flight_request_past_deadline_fails_shutdown() {
    let timeout = Duration::from_millis(100);
    let router = Router::new().route(
        "/hang",
        get(move || async move {
            tokio::time::sleep(timeout * 4).await;
            "late"
        }),
    );
    let service = bound_service(router).await;
    let addr = service.local_addr().unwrap();

    let scope = Scope::new();
    let run_scope = scope.clone();
    let handle = tokio::spawn(async move {
        run_until(&run_scope, service, RunConfig::new().shutdown_timeout(timeout)).await
    });

    tokio::spawn(async move {
        let _ = reqwest::get(format!("http://{}/hang", addr)).await;
    });
    // Let the request reach the handler.
    tokio::time::sleep(Duration::from_millis(50)).await;

    scope.cancel();
    let err = tokio::time::timeout(TEST_TIMEOUT, handle)
        .await
        .expect("run did not finish in time")
        .unwrap()
        .unwrap_err();
    assert!(err.is_shutdown_failure(), "got {err}");
}
