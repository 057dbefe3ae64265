//! Exposition HTTP layer
//!
//! `/metrics` renders the registry; when the periodic loop is not
//! running it triggers one on-demand cycle first, so a scrape always
//! reflects fresh values in request-driven deployments.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use couchstat_core::registry::CONTENT_TYPE;
use couchstat_domain::constants::{NAME, VERSION};
use serde_json::json;
use tracing::error;

use crate::context::AppContext;

/// Build the exposition router.
pub fn router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/metrics", get(handle_metrics))
        .route("/health_check", get(handle_health_check))
        .fallback(handle_not_found)
        .with_state(context)
}

async fn handle_metrics(State(context): State<Arc<AppContext>>) -> Response {
    {
        let orchestrator = context.orchestrator.lock().await;
        if !orchestrator.is_running() {
            if let Err(err) = orchestrator.collect().await {
                error!(error = %err, "failed to collect metrics");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Unable to fetch metrics")
                    .into_response();
            }
        }
    }

    match context.registry.render() {
        Ok(body) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "Unable to fetch metrics").into_response()
        }
    }
}

async fn handle_health_check() -> Response {
    Json(json!({ "name": NAME, "version": VERSION })).into_response()
}

async fn handle_not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" }))).into_response()
}
