//! Demo host for the graceful lifecycle coordinator.
//!
//! Serves a small HTTP API until SIGINT/SIGTERM, then shuts it down within
//! the configured timeout and runs the registered cleanups.
//!
//! ```text
//! graceful --config graceful.toml --bind 127.0.0.1:8080
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{routing::get, Json, Router};
use clap::Parser;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use graceful::config::{load_config, GracefulConfig};
use graceful::http::HttpService;
use graceful::lifecycle::{run, Cleanup, RunConfig, Scope};
use graceful::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => GracefulConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    // Initialize tracing subscriber
    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("failed to initialise logging: {e}");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        shutdown_timeout_ms = config.shutdown.timeout_ms,
        "Configuration loaded"
    );

    // Start metrics exporter
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Create HTTP service and run it until SIGINT/SIGTERM
    let service = Arc::new(HttpService::new(
        "demo-http",
        config.listener.bind_address.clone(),
        router(),
    ));

    let started = Instant::now();
    let run_config = RunConfig::from_config(&config.shutdown).cleanup(Cleanup::named(
        "report-uptime",
        move || {
            tracing::info!(uptime_secs = started.elapsed().as_secs(), "Demo host exiting");
        },
    ));

    match run(&Scope::new(), service, run_config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}

fn router() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/slow", get(slow))
        .layer(TraceLayer::new_for_http())
}

async fn index() -> Json<Value> {
    Json(json!({ "service": "demo-http", "version": env!("CARGO_PKG_VERSION") }))
}

async fn healthz() -> &'static str {
    "ok"
}

/// Holds the connection open long enough to observe draining on shutdown.
async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(2)).await;
    "done"
}
