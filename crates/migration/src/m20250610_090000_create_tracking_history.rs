use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TrackingChecks::Table)
                    .if_not_exists()
                    .col(pk_uuid(TrackingChecks::Id))
                    .col(uuid(TrackingChecks::TrackingId).not_null().to_owned())
                    .col(string(TrackingChecks::CheckType).not_null().to_owned())
                    .col(
                        timestamp_with_time_zone(TrackingChecks::CreatedAt)
                            .default(Expr::current_timestamp())
                            .not_null()
                            .to_owned(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(TrackingExceptions::Table)
                    .if_not_exists()
                    .col(pk_uuid(TrackingExceptions::Id))
                    .col(uuid(TrackingExceptions::TrackingId).not_null().to_owned())
                    .col(
                        string(TrackingExceptions::ExceptionType)
                            .not_null()
                            .to_owned(),
                    )
                    .col(string(TrackingExceptions::Severity).not_null().to_owned())
                    .col(string(TrackingExceptions::StatusRaw).not_null().to_owned())
                    .col(
                        timestamp_with_time_zone(TrackingExceptions::CreatedAt)
                            .default(Expr::current_timestamp())
                            .not_null()
                            .to_owned(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(TrackingEmails::Table)
                    .if_not_exists()
                    .col(pk_uuid(TrackingEmails::Id))
                    .col(uuid(TrackingEmails::TrackingId).not_null().to_owned())
                    .col(string(TrackingEmails::Email).not_null().to_owned())
                    .col(string(TrackingEmails::EmailType).not_null().to_owned())
                    .col(string_null(TrackingEmails::StatusRaw))
                    .col(
                        timestamp_with_time_zone(TrackingEmails::SentAt)
                            .default(Expr::current_timestamp())
                            .not_null()
                            .to_owned(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_tracking_exceptions_tracking_id")
                    .table(TrackingExceptions::Table)
                    .col(TrackingExceptions::TrackingId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_tracking_emails_tracking_id")
                    .table(TrackingEmails::Table)
                    .col(TrackingEmails::TrackingId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TrackingEmails::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TrackingExceptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TrackingChecks::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum TrackingChecks {
    Table,
    Id,
    TrackingId,
    CheckType,
    CreatedAt,
}

#[derive(Iden)]
enum TrackingExceptions {
    Table,
    Id,
    TrackingId,
    ExceptionType,
    Severity,
    StatusRaw,
    CreatedAt,
}

#[derive(Iden)]
enum TrackingEmails {
    Table,
    Id,
    TrackingId,
    Email,
    EmailType,
    StatusRaw,
    SentAt,
}
