use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Trackings::Table)
                    .if_not_exists()
                    .col(pk_uuid(Trackings::Id))
                    .col(uuid_null(Trackings::UserId))
                    .col(string(Trackings::TrackingCode).not_null().to_owned())
                    .col(
                        string(Trackings::Status)
                            .default("active")
                            .not_null()
                            .to_owned(),
                    )
                    .col(
                        string(Trackings::FlowStage)
                            .default("active")
                            .not_null()
                            .to_owned(),
                    )
                    .col(string_null(Trackings::LastStatusRaw))
                    .col(timestamp_with_time_zone_null(Trackings::LastCheckedAt))
                    .col(
                        boolean(Trackings::AlertSent)
                            .default(false)
                            .not_null()
                            .to_owned(),
                    )
                    .col(timestamp_with_time_zone_null(Trackings::DeliveredAt))
                    .col(
                        timestamp_with_time_zone(Trackings::CreatedAt)
                            .default(Expr::current_timestamp())
                            .not_null()
                            .to_owned(),
                    )
                    .to_owned(),
            )
            .await?;
        // Quota checks and the monitor both filter on owner + status.
        manager
            .create_index(
                Index::create()
                    .name("idx_trackings_user_id_status")
                    .table(Trackings::Table)
                    .col(Trackings::UserId)
                    .col(Trackings::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_trackings_user_id_status")
                    .table(Trackings::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Trackings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Trackings {
    Table,
    Id,
    UserId,
    TrackingCode,
    Status,
    FlowStage,
    LastStatusRaw,
    LastCheckedAt,
    AlertSent,
    DeliveredAt,
    CreatedAt,
}
