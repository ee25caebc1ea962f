//! Turns `tracking_exceptions` into a durable notification queue.
//!
//! Previously "one exception = one email" was implied by the `alert_sent`
//! boolean on the parent tracking. Adding `email_sent`/`email_sent_at` to the
//! exception row itself lets the monitor drain pending notifications
//! explicitly and retry failed sends without double-sending.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(TrackingExceptions::Table)
                    .add_column(
                        boolean(TrackingExceptions::EmailSent)
                            .default(false)
                            .not_null()
                            .to_owned(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(TrackingExceptions::Table)
                    .add_column(timestamp_with_time_zone_null(TrackingExceptions::EmailSentAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(TrackingExceptions::Table)
                    .drop_column(TrackingExceptions::EmailSentAt)
                    .to_owned(),
            )
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(TrackingExceptions::Table)
                    .drop_column(TrackingExceptions::EmailSent)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum TrackingExceptions {
    Table,
    EmailSent,
    EmailSentAt,
}
