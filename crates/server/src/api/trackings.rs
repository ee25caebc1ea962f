//! Tracking registration, gated by the plan quota.

use crate::AppResources;
use crate::api::downgrade_if_expired;
use crate::entity::tracking::TrackingStatus;
use crate::entity::{tracking, user};
use crate::plan::{check_quota, effective_plan};
use axum::http::StatusCode;
use axum::{Extension, Json, response::IntoResponse};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

/// Tag for OpenAPI documentation.
pub const TRACKINGS_TAG: &str = "Trackings API";

#[derive(Deserialize, ToSchema)]
struct CreateTracking {
    user_id: Uuid,
    tracking_code: String,
}

/// Creates the trackings API router.
#[tracing::instrument(skip_all)]
pub fn router() -> OpenApiRouter {
    OpenApiRouter::new().routes(routes!(create_tracking))
}

#[tracing::instrument(skip(resources, payload), fields(tracking_code = payload.tracking_code))]
#[utoipa::path(
    post,
    path = "/",
    operation_id = "Create Tracking",
    tag = TRACKINGS_TAG,
    summary = "Register a parcel for monitoring",
    description = "Registers a tracking code for the given user. The active-tracking quota of the user's plan \
                   is enforced: 1 for free, 50 for essential. Trackings count against the quota until they are \
                   delivered, including unresolved exceptions. An expired essential plan is downgraded to free \
                   before the check.",
    request_body(content = CreateTracking, description = "Owner and tracking code"),
    responses(
        (status = 200, description = "The created tracking", body = tracking::Model),
        (status = 400, description = "Missing tracking code", content_type = "application/json"),
        (status = 403, description = "Plan quota exceeded", content_type = "application/json"),
        (status = 404, description = "Unknown user", content_type = "application/json"),
        (status = 500, description = "Database error", content_type = "application/json")
    )
)]
async fn create_tracking(
    Extension(resources): Extension<AppResources>,
    Json(payload): Json<CreateTracking>,
) -> impl IntoResponse {
    let tracking_code = payload.tracking_code.trim().to_string();
    if tracking_code.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "tracking_code is required" })),
        );
    }

    let found = user::Entity::find_by_id(payload.user_id)
        .one(resources.db.as_ref())
        .await;
    let owner = match found {
        Ok(Some(u)) => u,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "User not found" })),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("DB error: {e}") })),
            );
        }
    };
    let owner = match downgrade_if_expired(resources.db.as_ref(), owner).await {
        Ok(u) => u,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("DB error: {e}") })),
            );
        }
    };

    // Everything not delivered occupies a monitoring slot.
    let in_use = match tracking::Entity::find()
        .filter(tracking::Column::UserId.eq(owner.id))
        .filter(tracking::Column::Status.ne(TrackingStatus::Delivered.as_str()))
        .count(resources.db.as_ref())
        .await
    {
        Ok(n) => n,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("DB error: {e}") })),
            );
        }
    };

    let now = OffsetDateTime::now_utc();
    if let Err(denied) = check_quota(effective_plan(&owner, now), in_use) {
        tracing::info!(
            name = "api.create_tracking.quota_exceeded",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            user_id = %owner.id,
            plan = %denied.plan,
            in_use = denied.in_use,
            message = "Tracking creation denied by plan quota"
        );
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": denied.to_string(), "code": "QuotaExceeded" })),
        );
    }

    let new_tracking = tracking::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(Some(owner.id)),
        tracking_code: Set(tracking_code),
        status: Set(TrackingStatus::Active.as_str().to_string()),
        flow_stage: Set(TrackingStatus::Active.as_str().to_string()),
        last_status_raw: Set(None),
        last_checked_at: Set(None),
        alert_sent: Set(false),
        delivered_at: Set(None),
        created_at: Set(now),
    };
    match new_tracking.insert(resources.db.as_ref()).await {
        Ok(t) => (StatusCode::OK, Json(json!(t))),
        Err(e) => {
            tracing::error!(
                name = "api.create_tracking.db_insert_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = ?e,
                message = "Failed to insert tracking"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("DB error: {e}") })),
            )
        }
    }
}
