//! Application events. Support requests are forwarded to the ops inbox.

use crate::AppResources;
use crate::email_templates::SupportRequestEmailTemplate;
use crate::entity::event;
use crate::notify::OutboundEmail;
use axum::http::StatusCode;
use axum::{Extension, Json, response::IntoResponse};
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

/// Tag for OpenAPI documentation.
pub const EVENTS_TAG: &str = "Events API";

#[derive(Deserialize, ToSchema)]
struct CreateEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[schema(value_type = Object)]
    payload: serde_json::Value,
}

#[derive(Deserialize, Default)]
struct SupportPayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    message: String,
}

/// Creates the events API router.
#[tracing::instrument(skip_all)]
pub fn router() -> OpenApiRouter {
    OpenApiRouter::new().routes(routes!(create_event))
}

#[tracing::instrument(skip(resources, payload), fields(event_type = payload.event_type))]
#[utoipa::path(
    post,
    path = "/",
    operation_id = "Create Event",
    tag = EVENTS_TAG,
    summary = "Record an application event",
    description = "Stores a free-form event. `support_request` events additionally notify the support inbox; \
                   a failed forward is logged but does not fail the request.",
    request_body(content = CreateEvent, description = "Event type and payload"),
    responses(
        (status = 200, description = "Event stored", content_type = "application/json"),
        (status = 500, description = "Database error", content_type = "application/json")
    )
)]
async fn create_event(
    Extension(resources): Extension<AppResources>,
    Json(payload): Json<CreateEvent>,
) -> impl IntoResponse {
    let stored = event::ActiveModel {
        id: Set(Uuid::new_v4()),
        event_type: Set(payload.event_type.clone()),
        payload: Set(payload.payload.clone()),
        created_at: Set(OffsetDateTime::now_utc()),
    }
    .insert(resources.db.as_ref())
    .await;
    if let Err(e) = stored {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("DB error: {e}") })),
        );
    }

    if payload.event_type == "support_request" {
        let support: SupportPayload =
            serde_json::from_value(payload.payload).unwrap_or_default();
        let template = SupportRequestEmailTemplate {
            name: support.name,
            email: support.email,
            message: support.message,
        };
        let outbound = OutboundEmail {
            to: resources.config.support_email.clone(),
            subject: template.subject(),
            text: template.render_text(),
        };
        if let Err(e) = resources.notifier.send(outbound).await {
            tracing::error!(
                name = "api.create_event.support_forward_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %e,
                message = "Failed to forward support request email"
            );
        }
    }

    (StatusCode::OK, Json(json!({ "ok": true })))
}
