//! Admin panel endpoints, all behind the shared-secret `x-admin-key` header.
//!
//! Staff use these to inspect trackings and their history, record manual
//! checks, raise exceptions, send manual alerts, mark parcels delivered and
//! activate paid plans.

use crate::AppResources;
use crate::api::auth::AdminKey;
use crate::email_templates::ManualAlertEmailTemplate;
use crate::entity::tracking::TrackingStatus;
use crate::entity::{tracking, tracking_check, tracking_email, tracking_exception, user};
use crate::monitor::store::{DetectedException, MonitorStore, SeaOrmStore};
use crate::notify::OutboundEmail;
use crate::plan::Plan;
use axum::http::StatusCode;
use axum::{
    Extension, Json,
    extract::{Path, Query},
    response::IntoResponse,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use time::format_description::well_known::Rfc3339;
use time::{Date, Month, OffsetDateTime};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

/// Tag for OpenAPI documentation.
pub const ADMIN_TAG: &str = "Admin API";

#[derive(Debug, Deserialize, IntoParams)]
struct AdminTrackingListParams {
    page: Option<u64>,
    limit: Option<u64>,
    /// Substring filter on the owner's email.
    email: Option<String>,
}

#[derive(Deserialize, ToSchema)]
struct RecordCheck {
    check_type: String,
}

#[derive(Deserialize, ToSchema)]
struct RaiseException {
    exception_type: String,
    severity: String,
}

#[derive(Deserialize, ToSchema)]
struct ActivatePlan {
    /// Payment timestamp, RFC 3339. The plan runs for one calendar month.
    paid_at: String,
}

/// Creates the admin API router.
#[tracing::instrument(skip_all)]
pub fn router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_trackings))
        .routes(routes!(tracking_history))
        .routes(routes!(exception_templates))
        .routes(routes!(record_check))
        .routes(routes!(raise_exception))
        .routes(routes!(send_manual_alert))
        .routes(routes!(mark_delivered))
        .routes(routes!(activate_plan))
        .routes(routes!(list_users))
}

/// One calendar month later, clamping the day for shorter months.
fn add_one_month(dt: OffsetDateTime) -> OffsetDateTime {
    let date = dt.date();
    let (year, month) = match date.month() {
        Month::December => (date.year() + 1, Month::January),
        m => (date.year(), m.next()),
    };
    let day = date.day().min(time::util::days_in_year_month(year, month));
    let new_date = Date::from_calendar_date(year, month, day).unwrap_or(date);
    dt.replace_date(new_date)
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/trackings",
    operation_id = "Admin List Trackings",
    tag = ADMIN_TAG,
    summary = "List all trackings",
    description = "Paginated listing of every tracking, newest first, optionally filtered by owner email \
                   substring. Each row is annotated with the owner's email and its exception/alert counts.",
    params(AdminTrackingListParams),
    responses(
        (status = 200, description = "One page of trackings", content_type = "application/json"),
        (status = 401, description = "Missing or wrong admin key", content_type = "application/json"),
        (status = 500, description = "Database error", content_type = "application/json")
    )
)]
async fn list_trackings(
    _admin: AdminKey,
    Extension(resources): Extension<AppResources>,
    Query(params): Query<AdminTrackingListParams>,
) -> impl IntoResponse {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(20).max(1);
    let db = resources.db.as_ref();

    // Resolve the owner filter to user ids first.
    let mut user_filter: Option<Vec<Uuid>> = None;
    if let Some(email) = params.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        let users = match user::Entity::find()
            .filter(user::Column::Email.contains(email))
            .all(db)
            .await
        {
            Ok(users) => users,
            Err(e) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": format!("DB error: {e}") })),
                );
            }
        };
        if users.is_empty() {
            return (
                StatusCode::OK,
                Json(json!({ "page": page, "limit": limit, "total": 0, "items": [] })),
            );
        }
        user_filter = Some(users.into_iter().map(|u| u.id).collect());
    }

    let mut query = tracking::Entity::find().order_by_desc(tracking::Column::CreatedAt);
    if let Some(ids) = &user_filter {
        query = query.filter(tracking::Column::UserId.is_in(ids.clone()));
    }
    let paginator = query.paginate(db, limit);
    let total = match paginator.num_items().await {
        Ok(n) => n,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("DB error: {e}") })),
            );
        }
    };
    let trackings = match paginator.fetch_page(page - 1).await {
        Ok(items) => items,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("DB error: {e}") })),
            );
        }
    };

    // Owner emails for the page.
    let owner_ids: Vec<Uuid> = trackings.iter().filter_map(|t| t.user_id).collect();
    let owners: HashMap<Uuid, String> = match user::Entity::find()
        .filter(user::Column::Id.is_in(owner_ids))
        .all(db)
        .await
    {
        Ok(users) => users.into_iter().map(|u| (u.id, u.email)).collect(),
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("DB error: {e}") })),
            );
        }
    };

    let mut items = Vec::with_capacity(trackings.len());
    for t in trackings {
        let exceptions_count = match tracking_exception::Entity::find()
            .filter(tracking_exception::Column::TrackingId.eq(t.id))
            .count(db)
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
        let alerts_count = match tracking_email::Entity::find()
            .filter(tracking_email::Column::TrackingId.eq(t.id))
            .count(db)
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
        let owner_email = t.user_id.and_then(|id| owners.get(&id).cloned());
        items.push(json!({
            "tracking": t,
            "owner_email": owner_email,
            "exceptions_count": exceptions_count,
            "alerts_count": alerts_count,
        }));
    }

    (
        StatusCode::OK,
        Json(json!({ "page": page, "limit": limit, "total": total, "items": items })),
    )
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/trackings/{id}/history",
    operation_id = "Admin Tracking History",
    tag = ADMIN_TAG,
    summary = "Full history of one tracking",
    params(("id" = Uuid, Path, description = "Tracking id")),
    responses(
        (status = 200, description = "Checks, exceptions and emails, newest first", content_type = "application/json"),
        (status = 401, description = "Missing or wrong admin key", content_type = "application/json"),
        (status = 500, description = "Database error", content_type = "application/json")
    )
)]
async fn tracking_history(
    _admin: AdminKey,
    Extension(resources): Extension<AppResources>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let db = resources.db.as_ref();
    let checks = tracking_check::Entity::find()
        .filter(tracking_check::Column::TrackingId.eq(id))
        .order_by_desc(tracking_check::Column::CreatedAt)
        .all(db)
        .await;
    let exceptions = tracking_exception::Entity::find()
        .filter(tracking_exception::Column::TrackingId.eq(id))
        .order_by_desc(tracking_exception::Column::CreatedAt)
        .all(db)
        .await;
    let emails = tracking_email::Entity::find()
        .filter(tracking_email::Column::TrackingId.eq(id))
        .order_by_desc(tracking_email::Column::SentAt)
        .all(db)
        .await;
    match (checks, exceptions, emails) {
        (Ok(checks), Ok(exceptions), Ok(emails)) => (
            StatusCode::OK,
            Json(json!({ "checks": checks, "exceptions": exceptions, "emails": emails })),
        ),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("DB error: {e}") })),
        ),
    }
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/exceptions/templates",
    operation_id = "Admin Exception Templates",
    tag = ADMIN_TAG,
    summary = "Recently used exception shapes",
    description = "The distinct (exception_type, severity, status_raw) triples among the 50 most recent \
                   exceptions, for pre-filling the manual exception form.",
    responses(
        (status = 200, description = "Distinct recent exception shapes", content_type = "application/json"),
        (status = 401, description = "Missing or wrong admin key", content_type = "application/json"),
        (status = 500, description = "Database error", content_type = "application/json")
    )
)]
async fn exception_templates(
    _admin: AdminKey,
    Extension(resources): Extension<AppResources>,
) -> impl IntoResponse {
    let recent = match tracking_exception::Entity::find()
        .order_by_desc(tracking_exception::Column::CreatedAt)
        .limit(50)
        .all(resources.db.as_ref())
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("DB error: {e}") })),
            );
        }
    };

    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for e in recent {
        let key = format!("{}|{}|{}", e.exception_type, e.severity, e.status_raw);
        if seen.insert(key) {
            unique.push(json!({
                "exception_type": e.exception_type,
                "severity": e.severity,
                "status_raw": e.status_raw,
            }));
        }
    }
    (StatusCode::OK, Json(json!(unique)))
}

#[tracing::instrument(skip(resources, payload))]
#[utoipa::path(
    post,
    path = "/trackings/{id}/check",
    operation_id = "Admin Record Check",
    tag = ADMIN_TAG,
    summary = "Record a manual check",
    params(("id" = Uuid, Path, description = "Tracking id")),
    request_body(content = RecordCheck),
    responses(
        (status = 200, description = "Check recorded", content_type = "application/json"),
        (status = 401, description = "Missing or wrong admin key", content_type = "application/json"),
        (status = 500, description = "Database error", content_type = "application/json")
    )
)]
async fn record_check(
    _admin: AdminKey,
    Extension(resources): Extension<AppResources>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordCheck>,
) -> impl IntoResponse {
    let now = OffsetDateTime::now_utc();
    let inserted = tracking_check::ActiveModel {
        id: Set(Uuid::new_v4()),
        tracking_id: Set(id),
        check_type: Set(payload.check_type),
        created_at: Set(now),
    }
    .insert(resources.db.as_ref())
    .await;
    if let Err(e) = inserted {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("DB error: {e}") })),
        );
    }

    let touched = tracking::Entity::update_many()
        .col_expr(tracking::Column::LastCheckedAt, Expr::value(now))
        .filter(tracking::Column::Id.eq(id))
        .exec(resources.db.as_ref())
        .await;
    if let Err(e) = touched {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("DB error: {e}") })),
        );
    }
    (StatusCode::OK, Json(json!({ "ok": true })))
}

#[tracing::instrument(skip(resources, payload))]
#[utoipa::path(
    post,
    path = "/trackings/{id}/exception",
    operation_id = "Admin Raise Exception",
    tag = ADMIN_TAG,
    summary = "Raise an exception manually",
    description = "Records an exception against the tracking and advances it to the exception state. The \
                   notification is queued like an automatically detected one: the next monitor pass (or a \
                   manual send) emails the owner exactly once.",
    params(("id" = Uuid, Path, description = "Tracking id")),
    request_body(content = RaiseException),
    responses(
        (status = 200, description = "Exception recorded", content_type = "application/json"),
        (status = 400, description = "Missing fields", content_type = "application/json"),
        (status = 401, description = "Missing or wrong admin key", content_type = "application/json"),
        (status = 404, description = "Unknown tracking", content_type = "application/json"),
        (status = 409, description = "Tracking already delivered", content_type = "application/json"),
        (status = 500, description = "Database error", content_type = "application/json")
    )
)]
async fn raise_exception(
    _admin: AdminKey,
    Extension(resources): Extension<AppResources>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RaiseException>,
) -> impl IntoResponse {
    if payload.exception_type.trim().is_empty() || payload.severity.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "exception_type and severity are required" })),
        );
    }

    let found = tracking::Entity::find_by_id(id)
        .one(resources.db.as_ref())
        .await;
    let t = match found {
        Ok(Some(t)) => t,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Tracking not found" })),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("DB error: {e}") })),
            );
        }
    };
    // Delivered is terminal.
    if t.status == TrackingStatus::Delivered.as_str() {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "Tracking already delivered" })),
        );
    }

    let store = SeaOrmStore::new(resources.db.clone());
    let detection = DetectedException {
        tracking_id: t.id,
        exception_type: payload.exception_type,
        severity: payload.severity,
        status_raw: t.last_status_raw.unwrap_or_else(|| "-".to_string()),
    };
    match store
        .record_exception(&detection, OffsetDateTime::now_utc())
        .await
    {
        Ok(exception_id) => (
            StatusCode::OK,
            Json(json!({ "ok": true, "exception_id": exception_id })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("DB error: {e}") })),
        ),
    }
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    post,
    path = "/trackings/{id}/send-email",
    operation_id = "Admin Send Alert",
    tag = ADMIN_TAG,
    summary = "Send the pending alert now",
    description = "Sends the alert for the tracking's oldest pending exception immediately instead of waiting \
                   for the next monitor pass, then flips the same dedup flags the monitor would.",
    params(("id" = Uuid, Path, description = "Tracking id")),
    responses(
        (status = 200, description = "Alert sent", content_type = "application/json"),
        (status = 401, description = "Missing or wrong admin key", content_type = "application/json"),
        (status = 404, description = "Unknown tracking", content_type = "application/json"),
        (status = 409, description = "Already alerted or nothing pending", content_type = "application/json"),
        (status = 502, description = "Email delivery failed", content_type = "application/json"),
        (status = 500, description = "Database error", content_type = "application/json")
    )
)]
async fn send_manual_alert(
    _admin: AdminKey,
    Extension(resources): Extension<AppResources>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let db = resources.db.as_ref();
    let found = tracking::Entity::find_by_id(id).one(db).await;
    let t = match found {
        Ok(Some(t)) => t,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Tracking not found" })),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("DB error: {e}") })),
            );
        }
    };
    if t.alert_sent {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "Alert already sent for this tracking" })),
        );
    }

    let pending = match tracking_exception::Entity::find()
        .filter(tracking_exception::Column::TrackingId.eq(t.id))
        .filter(tracking_exception::Column::EmailSent.eq(false))
        .order_by_asc(tracking_exception::Column::CreatedAt)
        .one(db)
        .await
    {
        Ok(Some(p)) => p,
        Ok(None) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "error": "No pending exception for this tracking" })),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("DB error: {e}") })),
            );
        }
    };

    let owner_email = match t.user_id {
        Some(user_id) => match user::Entity::find_by_id(user_id).one(db).await {
            Ok(Some(u)) if !u.email.trim().is_empty() => u.email,
            Ok(_) => {
                return (
                    StatusCode::CONFLICT,
                    Json(json!({ "error": "Owner has no usable email address" })),
                );
            }
            Err(e) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": format!("DB error: {e}") })),
                );
            }
        },
        None => {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "error": "Tracking has no owner" })),
            );
        }
    };

    let template = ManualAlertEmailTemplate {
        tracking_code: t.tracking_code.clone(),
        status_raw: t.last_status_raw.clone(),
    };
    let outbound = OutboundEmail {
        to: owner_email.clone(),
        subject: template.subject(),
        text: template.render_text(),
    };
    if let Err(e) = resources.notifier.send(outbound).await {
        tracing::error!(
            name = "api.send_manual_alert.send_failed",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            tracking_id = %t.id,
            error = %e,
            message = "Manual alert email failed"
        );
        return (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": format!("Email delivery failed: {e}") })),
        );
    }

    let now = OffsetDateTime::now_utc();
    let store = SeaOrmStore::new(resources.db.clone());
    if let Err(e) = store.mark_notified(pending.id, t.id, now).await {
        // The email already went out; surface the inconsistency but do not
        // pretend the send failed.
        tracing::error!(
            name = "api.send_manual_alert.mark_failed",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            tracking_id = %t.id,
            error = %e,
            message = "Manual alert sent but flags not persisted"
        );
    }
    if let Err(e) = store
        .log_email(
            t.id,
            &owner_email,
            "manual",
            t.last_status_raw.as_deref(),
            now,
        )
        .await
    {
        tracing::warn!(
            name = "api.send_manual_alert.audit_log_failed",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            tracking_id = %t.id,
            error = %e,
            message = "Could not append to the email audit log"
        );
    }

    (StatusCode::OK, Json(json!({ "ok": true })))
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    post,
    path = "/trackings/{id}/delivered",
    operation_id = "Admin Mark Delivered",
    tag = ADMIN_TAG,
    summary = "Mark a tracking delivered",
    description = "Terminal transition: the tracking stops counting against the quota and is never monitored again.",
    params(("id" = Uuid, Path, description = "Tracking id")),
    responses(
        (status = 200, description = "Tracking delivered", content_type = "application/json"),
        (status = 401, description = "Missing or wrong admin key", content_type = "application/json"),
        (status = 500, description = "Database error", content_type = "application/json")
    )
)]
async fn mark_delivered(
    _admin: AdminKey,
    Extension(resources): Extension<AppResources>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let now = OffsetDateTime::now_utc();
    let updated = tracking::Entity::update_many()
        .col_expr(
            tracking::Column::Status,
            Expr::value(TrackingStatus::Delivered.as_str()),
        )
        .col_expr(
            tracking::Column::FlowStage,
            Expr::value(TrackingStatus::Delivered.as_str()),
        )
        .col_expr(tracking::Column::DeliveredAt, Expr::value(now))
        .filter(tracking::Column::Id.eq(id))
        .exec(resources.db.as_ref())
        .await;
    match updated {
        Ok(_) => (StatusCode::OK, Json(json!({ "ok": true }))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("DB error: {e}") })),
        ),
    }
}

#[tracing::instrument(skip(resources, payload))]
#[utoipa::path(
    post,
    path = "/users/{id}/activate-plan",
    operation_id = "Admin Activate Plan",
    tag = ADMIN_TAG,
    summary = "Activate the essential plan",
    description = "Marks the user as paid: essential plan for one calendar month from `paid_at`.",
    params(("id" = Uuid, Path, description = "User id")),
    request_body(content = ActivatePlan),
    responses(
        (status = 200, description = "Plan activated", content_type = "application/json"),
        (status = 400, description = "Missing or invalid paid_at", content_type = "application/json"),
        (status = 401, description = "Missing or wrong admin key", content_type = "application/json"),
        (status = 500, description = "Database error", content_type = "application/json")
    )
)]
async fn activate_plan(
    _admin: AdminKey,
    Extension(resources): Extension<AppResources>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ActivatePlan>,
) -> impl IntoResponse {
    let paid_at = match OffsetDateTime::parse(&payload.paid_at, &Rfc3339) {
        Ok(ts) => ts,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "paid_at must be a valid RFC 3339 timestamp" })),
            );
        }
    };
    let paid_until = add_one_month(paid_at);

    let updated = user::Entity::update_many()
        .col_expr(user::Column::Plan, Expr::value(Plan::Essential.as_str()))
        .col_expr(user::Column::PlanActivatedAt, Expr::value(paid_at))
        .col_expr(user::Column::PlanPaidUntil, Expr::value(paid_until))
        .filter(user::Column::Id.eq(id))
        .exec(resources.db.as_ref())
        .await;
    match updated {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "plan": Plan::Essential.as_str(),
                "paid_until": paid_until.format(&Rfc3339).ok(),
            })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("DB error: {e}") })),
        ),
    }
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/users",
    operation_id = "Admin List Users",
    tag = ADMIN_TAG,
    summary = "List all users with plan status",
    responses(
        (status = 200, description = "Users with plan status and tracking counts", content_type = "application/json"),
        (status = 401, description = "Missing or wrong admin key", content_type = "application/json"),
        (status = 500, description = "Database error", content_type = "application/json")
    )
)]
async fn list_users(
    _admin: AdminKey,
    Extension(resources): Extension<AppResources>,
) -> impl IntoResponse {
    let db = resources.db.as_ref();
    let users = match user::Entity::find()
        .order_by_desc(user::Column::CreatedAt)
        .all(db)
        .await
    {
        Ok(users) => users,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("DB error: {e}") })),
            );
        }
    };

    let now = OffsetDateTime::now_utc();
    let mut items = Vec::with_capacity(users.len());
    for u in users {
        let trackings_count = match tracking::Entity::find()
            .filter(tracking::Column::UserId.eq(u.id))
            .count(db)
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
        let is_active = Plan::from_str_lossy(&u.plan) == Plan::Essential
            && u.plan_paid_until.is_some_and(|until| until >= now);
        items.push(json!({
            "id": u.id,
            "email": u.email,
            "plan": u.plan,
            "paid_until": u.plan_paid_until.and_then(|ts| ts.format(&Rfc3339).ok()),
            "status": if is_active { "ATIVO" } else { "VENCIDO" },
            "trackings_count": trackings_count,
        }));
    }
    (StatusCode::OK, Json(json!(items)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn one_month_later_in_the_same_year() {
        let paid_at = datetime!(2025-03-15 12:00 UTC);
        assert_eq!(add_one_month(paid_at), datetime!(2025-04-15 12:00 UTC));
    }

    #[test]
    fn december_rolls_into_the_next_year() {
        let paid_at = datetime!(2025-12-31 08:30 UTC);
        assert_eq!(add_one_month(paid_at), datetime!(2026-01-31 08:30 UTC));
    }

    #[test]
    fn day_is_clamped_for_short_months() {
        let paid_at = datetime!(2025-01-31 00:00 UTC);
        assert_eq!(add_one_month(paid_at), datetime!(2025-02-28 00:00 UTC));
    }
}
