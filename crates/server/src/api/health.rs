//! Liveness endpoint.

/// Tag for OpenAPI documentation.
pub const MISC_TAG: &str = "Miscellaneous";

/// Liveness probe.
///
/// Deliberately touches neither the database nor the SMTP transport: it only
/// proves the process is up and serving requests, so a degraded dependency
/// never makes the orchestrator restart the service.
#[tracing::instrument()]
#[utoipa::path(
    method(get, head),
    path = "/healthz",
    tag = MISC_TAG,
    operation_id = "Health Check",
    summary = "Service liveness check",
    description = "Returns a plain `ok` once the process is accepting requests. No dependency checks are performed.",
    responses(
        (status = 200, description = "Service is up", body = str, content_type = "text/plain", example = "ok")
    )
)]
pub async fn health() -> &'static str {
    "ok"
}
