//! API module providing the HTTP endpoints.
//!
//! This module is organized into submodules:
//! - `users` - Signup and per-user tracking listings (/api/users/*)
//! - `trackings` - Tracking registration (/api/trackings)
//! - `monitor` - Manual monitor trigger (/api/monitor/run)
//! - `events` - Application events (/api/events)
//! - `admin` - Staff endpoints behind the shared admin key (/admin/*)
//! - `health` - Health check endpoint (/healthz)
//! - `openapi` - OpenAPI/Utoipa configuration

pub mod admin;
pub mod auth;
pub mod events;
pub mod health;
pub mod monitor;
pub mod openapi;
pub mod trackings;
pub mod users;

pub use monitor::MonitorApiState;

use crate::AppResources;
use crate::entity::user;
use crate::plan::plan_expired;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use time::OffsetDateTime;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

/// Persist the lazy free downgrade for a lapsed essential plan and return
/// the user as the rest of the request should see them.
pub(crate) async fn downgrade_if_expired<C: ConnectionTrait>(
    db: &C,
    user_model: user::Model,
) -> Result<user::Model, DbErr> {
    let now = OffsetDateTime::now_utc();
    if !plan_expired(&user_model, now) {
        return Ok(user_model);
    }
    user::Entity::update_many()
        .col_expr(user::Column::Plan, Expr::value("free"))
        .col_expr(
            user::Column::PlanPaidUntil,
            Expr::value(Option::<OffsetDateTime>::None),
        )
        .filter(user::Column::Id.eq(user_model.id))
        .exec(db)
        .await?;
    tracing::info!(
        name = "api.plan.lazy_downgrade",
        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
        user_id = %user_model.id,
        message = "Expired essential plan downgraded to free"
    );
    Ok(user::Model {
        plan: "free".to_string(),
        plan_paid_until: None,
        ..user_model
    })
}

/// Builds the full application router. Split out of [`start_webserver`] so
/// tests can drive it without binding a socket.
#[tracing::instrument(skip_all)]
pub fn build_router(
    monitor_state: MonitorApiState,
    app_resources: AppResources,
) -> axum::Router {
    let cors = if app_resources.config.allowed_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = app_resources
            .config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                CONTENT_TYPE,
                AUTHORIZATION,
                HeaderName::from_static(auth::ADMIN_KEY_HEADER),
            ])
    };

    let (router, api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .routes(routes!(health::health))
        .nest("/api/users", users::router())
        .nest("/api/trackings", trackings::router())
        .nest("/api/monitor", monitor::router(monitor_state))
        .nest("/api/events", events::router())
        .nest("/admin", admin::router())
        .layer(axum::Extension(app_resources))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    router.merge(Redoc::with_url("/api-docs", api))
}

/// Starts the web server with all configured routes.
#[tracing::instrument(skip(monitor_state, app_resources))]
pub async fn start_webserver(
    monitor_state: MonitorApiState,
    app_resources: AppResources,
) -> color_eyre::Result<()> {
    let bind_addr = app_resources.config.bind_addr.clone();
    let router = build_router(monitor_state, app_resources);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(
        name = "api.server.started",
        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
        addr = %bind_addr,
        message = "Server running"
    );
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
