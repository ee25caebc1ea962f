//! Package-tracking alert service.
//!
//! Users register parcels by tracking code; the monitor periodically checks
//! carrier status, records delivery exceptions and emails the owner once per
//! exception. Staff manage trackings, plans and manual alerts through the
//! admin endpoints.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::notify::Notifier;

pub mod api;
pub mod carrier;
pub mod config;
pub mod email_templates;
pub mod entity;
pub mod error;
pub mod matcher;
pub mod monitor;
pub mod notify;
pub mod plan;

/// Shared handles injected into every request handler.
#[derive(Clone)]
pub struct AppResources {
    pub db: Arc<DatabaseConnection>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<AppConfig>,
}
