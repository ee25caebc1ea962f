//! Persistence port for the monitor.
//!
//! The job only sees this trait; `SeaOrmStore` is the production
//! implementation. The two state-advancing operations each run in a
//! transaction so the paired writes (exception row + tracking row) cannot
//! diverge under partial failure.

use crate::entity::tracking::TrackingStatus;
use crate::entity::{exception_rule, tracking, tracking_email, tracking_exception, user};
use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, TransactionError, TransactionTrait,
};
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

/// A freshly matched exception, ready to be recorded.
#[derive(Clone, Debug)]
pub struct DetectedException {
    pub tracking_id: Uuid,
    pub exception_type: String,
    pub severity: String,
    pub status_raw: String,
}

/// An exception row awaiting its notification, joined to tracking context.
#[derive(Clone, Debug)]
pub struct PendingNotification {
    pub exception_id: Uuid,
    pub tracking_id: Uuid,
    pub tracking_code: String,
    pub user_id: Option<Uuid>,
    pub status_raw: String,
}

#[async_trait]
pub trait MonitorStore: Send + Sync {
    /// All trackings still open for monitoring: `status = active` and not
    /// yet delivered.
    async fn active_trackings(&self) -> Result<Vec<tracking::Model>, DbErr>;

    /// Rules with `notify = true`, in (created_at, id) order so rule
    /// matching is deterministic across passes.
    async fn notify_rules(&self) -> Result<Vec<exception_rule::Model>, DbErr>;

    async fn user_email(&self, user_id: Uuid) -> Result<Option<String>, DbErr>;

    /// Record a detected exception: inserts the pending exception row and
    /// advances the tracking to `exception` in one transaction.
    async fn record_exception(
        &self,
        detection: &DetectedException,
        now: OffsetDateTime,
    ) -> Result<Uuid, DbErr>;

    /// Exception rows with `email_sent = false`, oldest first.
    async fn pending_notifications(&self) -> Result<Vec<PendingNotification>, DbErr>;

    /// Flip the dedup flags after a successful send: `email_sent` on the
    /// exception row and `alert_sent` on the tracking, in one transaction.
    async fn mark_notified(
        &self,
        exception_id: Uuid,
        tracking_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<(), DbErr>;

    /// Best-effort bump of `last_checked_at` when a check found nothing.
    async fn touch_last_checked(&self, tracking_id: Uuid, now: OffsetDateTime)
    -> Result<(), DbErr>;

    /// Append to the outbound email audit log.
    async fn log_email(
        &self,
        tracking_id: Uuid,
        email: &str,
        email_type: &str,
        status_raw: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<(), DbErr>;
}

/// SeaORM-backed store used in production.
#[derive(Clone)]
pub struct SeaOrmStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn flatten_txn_err(e: TransactionError<DbErr>) -> DbErr {
    match e {
        TransactionError::Connection(e) => e,
        TransactionError::Transaction(e) => e,
    }
}

#[async_trait]
impl MonitorStore for SeaOrmStore {
    async fn active_trackings(&self) -> Result<Vec<tracking::Model>, DbErr> {
        tracking::Entity::find()
            .filter(tracking::Column::Status.eq(TrackingStatus::Active.as_str()))
            .filter(tracking::Column::DeliveredAt.is_null())
            .all(self.db.as_ref())
            .await
    }

    async fn notify_rules(&self) -> Result<Vec<exception_rule::Model>, DbErr> {
        exception_rule::Entity::find()
            .filter(exception_rule::Column::Notify.eq(true))
            .order_by_asc(exception_rule::Column::CreatedAt)
            .order_by_asc(exception_rule::Column::Id)
            .all(self.db.as_ref())
            .await
    }

    async fn user_email(&self, user_id: Uuid) -> Result<Option<String>, DbErr> {
        Ok(user::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?
            .map(|u| u.email))
    }

    async fn record_exception(
        &self,
        detection: &DetectedException,
        now: OffsetDateTime,
    ) -> Result<Uuid, DbErr> {
        let detection = detection.clone();
        self.db
            .transaction::<_, Uuid, DbErr>(move |txn| {
                Box::pin(async move {
                    let exception_id = Uuid::new_v4();
                    tracking_exception::ActiveModel {
                        id: Set(exception_id),
                        tracking_id: Set(detection.tracking_id),
                        exception_type: Set(detection.exception_type.clone()),
                        severity: Set(detection.severity.clone()),
                        status_raw: Set(detection.status_raw.clone()),
                        email_sent: Set(false),
                        email_sent_at: Set(None),
                        created_at: Set(now),
                    }
                    .insert(txn)
                    .await?;

                    tracking::Entity::update_many()
                        .col_expr(
                            tracking::Column::Status,
                            Expr::value(TrackingStatus::Exception.as_str()),
                        )
                        .col_expr(
                            tracking::Column::FlowStage,
                            Expr::value(TrackingStatus::Exception.as_str()),
                        )
                        .col_expr(
                            tracking::Column::LastStatusRaw,
                            Expr::value(detection.status_raw.clone()),
                        )
                        .col_expr(tracking::Column::LastCheckedAt, Expr::value(now))
                        .filter(tracking::Column::Id.eq(detection.tracking_id))
                        .exec(txn)
                        .await?;

                    Ok(exception_id)
                })
            })
            .await
            .map_err(flatten_txn_err)
    }

    async fn pending_notifications(&self) -> Result<Vec<PendingNotification>, DbErr> {
        let pending = tracking_exception::Entity::find()
            .filter(tracking_exception::Column::EmailSent.eq(false))
            .order_by_asc(tracking_exception::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        let mut out = Vec::with_capacity(pending.len());
        for exception in pending {
            // An orphaned exception row has nothing to notify about.
            let Some(t) = tracking::Entity::find_by_id(exception.tracking_id)
                .one(self.db.as_ref())
                .await?
            else {
                continue;
            };
            out.push(PendingNotification {
                exception_id: exception.id,
                tracking_id: t.id,
                tracking_code: t.tracking_code,
                user_id: t.user_id,
                status_raw: exception.status_raw,
            });
        }
        Ok(out)
    }

    async fn mark_notified(
        &self,
        exception_id: Uuid,
        tracking_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<(), DbErr> {
        self.db
            .transaction::<_, (), DbErr>(move |txn| {
                Box::pin(async move {
                    // Conditional on email_sent so an overlapping pass can
                    // never flip the same row twice.
                    tracking_exception::Entity::update_many()
                        .col_expr(tracking_exception::Column::EmailSent, Expr::value(true))
                        .col_expr(tracking_exception::Column::EmailSentAt, Expr::value(now))
                        .filter(tracking_exception::Column::Id.eq(exception_id))
                        .filter(tracking_exception::Column::EmailSent.eq(false))
                        .exec(txn)
                        .await?;

                    tracking::Entity::update_many()
                        .col_expr(tracking::Column::AlertSent, Expr::value(true))
                        .filter(tracking::Column::Id.eq(tracking_id))
                        .exec(txn)
                        .await?;
                    Ok(())
                })
            })
            .await
            .map_err(flatten_txn_err)
    }

    async fn touch_last_checked(
        &self,
        tracking_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<(), DbErr> {
        tracking::Entity::update_many()
            .col_expr(tracking::Column::LastCheckedAt, Expr::value(now))
            .filter(tracking::Column::Id.eq(tracking_id))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn log_email(
        &self,
        tracking_id: Uuid,
        email: &str,
        email_type: &str,
        status_raw: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<(), DbErr> {
        tracking_email::ActiveModel {
            id: Set(Uuid::new_v4()),
            tracking_id: Set(tracking_id),
            email: Set(email.to_string()),
            email_type: Set(email_type.to_string()),
            status_raw: Set(status_raw.map(|s| s.to_string())),
            sent_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await?;
        Ok(())
    }
}
