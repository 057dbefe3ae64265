//! Couchstat, a Couchbase statistics exporter
//!
//! Binary entry point: loads configuration from the environment, starts
//! the periodic collection loop, and serves `/metrics` and
//! `/health_check` until SIGINT or SIGTERM.

use std::sync::Arc;

use anyhow::Context as _;
use couchstat_domain::constants::{NAME, VERSION};
use couchstat_lib::context::AppContext;
use couchstat_lib::server;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = couchstat_infra::config::load_from_env().context("loading configuration")?;

    // RUST_LOG wins when set; LOGLEVEL seeds the default filter.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(name = NAME, version = VERSION, "starting");

    let context = Arc::new(AppContext::new(config.clone()).context("wiring application")?);

    if config.collection.poll_interval.is_zero() {
        info!("FETCH_DELAY is 0; collecting on demand per scrape");
    } else {
        context.orchestrator.lock().await.start().await.context("starting collection loop")?;
    }

    let listener = TcpListener::bind(("0.0.0.0", config.server.port))
        .await
        .context("binding listen port")?;
    info!(port = config.server.port, "listen");

    axum::serve(listener, server::router(Arc::clone(&context)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    let mut orchestrator = context.orchestrator.lock().await;
    if orchestrator.is_running() {
        orchestrator.stop().await.context("stopping collection loop")?;
    }

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install SIGINT handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => error!(error = %err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => warn!(signal = "SIGINT", "shutting down"),
        () = terminate => warn!(signal = "SIGTERM", "shutting down"),
    }
}
