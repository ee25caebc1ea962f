//! A monitored parcel, owned by one user.
//!
//! `status` only moves forward: active -> exception -> delivered, with
//! delivered terminal. `flow_stage` mirrors `status` for display purposes.

use sea_orm::entity::prelude::*;
use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, ToSchema)]
#[sea_orm(table_name = "trackings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub tracking_code: String,
    pub status: String, // "active", "exception" or "delivered"
    pub flow_stage: String,
    pub last_status_raw: Option<String>,
    pub last_checked_at: Option<OffsetDateTime>,
    pub alert_sent: bool,
    pub delivered_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Tracking lifecycle states.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrackingStatus {
    Active,
    Exception,
    Delivered,
}

impl TrackingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingStatus::Active => "active",
            TrackingStatus::Exception => "exception",
            TrackingStatus::Delivered => "delivered",
        }
    }
}

impl std::fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
