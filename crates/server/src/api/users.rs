//! User endpoints: idempotent signup by email and per-user tracking listings.

use crate::AppResources;
use crate::api::downgrade_if_expired;
use crate::entity::{tracking, user};
use axum::{
    Extension, Json,
    extract::{Path, Query},
    response::IntoResponse,
};
use axum::http::StatusCode;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

/// Tag for OpenAPI documentation.
pub const USERS_TAG: &str = "Users API";

#[derive(Deserialize, ToSchema)]
struct CreateUser {
    email: String,
}

#[derive(Debug, Deserialize, IntoParams)]
struct TrackingListParams {
    page: Option<u64>,
    limit: Option<u64>,
    status: Option<String>,
}

/// Creates the users API router.
#[tracing::instrument(skip_all)]
pub fn router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(create_user))
        .routes(routes!(list_user_trackings))
}

#[tracing::instrument(skip(resources, payload), fields(email_len = payload.email.len()))]
#[utoipa::path(
    post,
    path = "/",
    operation_id = "Create User",
    tag = USERS_TAG,
    summary = "Identify a user by email",
    description = "Idempotent upsert-by-email: returns the existing user when the address is already known, \
                   otherwise creates a new free-plan user.",
    request_body(content = CreateUser, description = "User email"),
    responses(
        (status = 200, description = "The user", body = user::Model),
        (status = 400, description = "Missing or invalid email", content_type = "application/json"),
        (status = 500, description = "Database error", content_type = "application/json")
    )
)]
async fn create_user(
    Extension(resources): Extension<AppResources>,
    Json(payload): Json<CreateUser>,
) -> impl IntoResponse {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "A valid email is required" })),
        );
    }

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email.clone()))
        .one(resources.db.as_ref())
        .await;
    match existing {
        Ok(Some(u)) => (StatusCode::OK, Json(json!(u))),
        Ok(None) => {
            let new_user = user::ActiveModel {
                id: Set(Uuid::new_v4()),
                email: Set(email),
                plan: Set("free".to_string()),
                plan_activated_at: Set(None),
                plan_paid_until: Set(None),
                created_at: Set(OffsetDateTime::now_utc()),
            };
            match new_user.insert(resources.db.as_ref()).await {
                Ok(u) => (StatusCode::OK, Json(json!(u))),
                Err(e) => {
                    tracing::error!(
                        name = "api.create_user.db_insert_failed",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        error = ?e,
                        message = "Failed to insert new user"
                    );
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": format!("DB error: {e}") })),
                    )
                }
            }
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("DB error: {e}") })),
        ),
    }
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/{id}/trackings",
    operation_id = "List User Trackings",
    tag = USERS_TAG,
    summary = "List a user's trackings",
    description = "Paginated listing of the user's trackings, newest first, with an optional status filter.",
    params(
        ("id" = Uuid, Path, description = "User id"),
        TrackingListParams
    ),
    responses(
        (status = 200, description = "One page of trackings", content_type = "application/json"),
        (status = 404, description = "Unknown user", content_type = "application/json"),
        (status = 500, description = "Database error", content_type = "application/json")
    )
)]
async fn list_user_trackings(
    Extension(resources): Extension<AppResources>,
    Path(id): Path<Uuid>,
    Query(params): Query<TrackingListParams>,
) -> impl IntoResponse {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(10).max(1);

    let found = user::Entity::find_by_id(id).one(resources.db.as_ref()).await;
    let user_model = match found {
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
    // Reading the user for a plan-gated surface is the lazy downgrade point.
    let user_model = match downgrade_if_expired(resources.db.as_ref(), user_model).await {
        Ok(u) => u,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("DB error: {e}") })),
            );
        }
    };

    let mut query = tracking::Entity::find()
        .filter(tracking::Column::UserId.eq(user_model.id))
        .order_by_desc(tracking::Column::CreatedAt);
    if let Some(status) = params.status.as_deref() {
        query = query.filter(tracking::Column::Status.eq(status));
    }

    let paginator = query.paginate(resources.db.as_ref(), limit);
    let total = match paginator.num_items().await {
        Ok(n) => n,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("DB error: {e}") })),
            );
        }
    };
    match paginator.fetch_page(page - 1).await {
        Ok(items) => (
            StatusCode::OK,
            Json(json!({
                "page": page,
                "limit": limit,
                "total": total,
                "items": items,
            })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("DB error: {e}") })),
        ),
    }
}
