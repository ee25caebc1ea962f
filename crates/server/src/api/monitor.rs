//! Manual monitor trigger.

use crate::monitor::{MonitorJob, PassSummary};
use axum::http::StatusCode;
use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use std::sync::Arc;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const MONITOR_TAG: &str = "Monitor API";

/// Shared state for the monitor endpoints.
#[derive(Clone)]
pub struct MonitorApiState {
    pub job: Arc<MonitorJob>,
}

/// Creates the monitor API router.
#[tracing::instrument(skip_all)]
pub fn router(state: MonitorApiState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(run_monitor))
        .with_state(state)
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    post,
    path = "/run",
    operation_id = "Run Monitor Pass",
    tag = MONITOR_TAG,
    summary = "Run one monitor pass now",
    description = "Synchronously runs one full monitoring pass over all open trackings and returns the pass \
                   summary. Per-record failures are reflected in the counters; only a failure of the initial \
                   bulk reads produces a non-ok response.",
    responses(
        (status = 200, description = "Pass summary", body = PassSummary),
        (status = 502, description = "A fatal store read aborted the pass", content_type = "application/json")
    )
)]
async fn run_monitor(State(state): State<MonitorApiState>) -> impl IntoResponse {
    match state.job.run_pass().await {
        Ok(summary) => (StatusCode::OK, Json(json!(summary))),
        Err(e) => {
            tracing::error!(
                name = "api.run_monitor.pass_aborted",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %e,
                message = "Manual monitor pass aborted"
            );
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}
