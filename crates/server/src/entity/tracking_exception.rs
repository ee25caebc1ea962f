//! One row per detected (or manually raised) delivery exception.
//!
//! `email_sent` is the authoritative notification dedup flag: rows with
//! `email_sent = false` form the pending-notification queue drained by the
//! monitor. The `alert_sent` boolean on the parent tracking mirrors it.

use sea_orm::entity::prelude::*;
use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, ToSchema)]
#[sea_orm(table_name = "tracking_exceptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tracking_id: Uuid,
    pub exception_type: String,
    pub severity: String,
    pub status_raw: String,
    pub email_sent: bool,
    pub email_sent_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
