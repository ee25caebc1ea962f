//! Per-recipient audit log of every outbound notification.
//!
//! Records the address, type and timing of each email so staff can see what
//! a customer was actually told. Can be cleared per user on an erasure
//! request without touching the tracking history itself.

use sea_orm::entity::prelude::*;
use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, ToSchema)]
#[sea_orm(table_name = "tracking_emails")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tracking_id: Uuid,
    pub email: String,
    pub email_type: String, // "exception", "manual" or "support"
    pub status_raw: Option<String>,
    pub sent_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
