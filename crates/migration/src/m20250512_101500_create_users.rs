use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_uuid(Users::Id))
                    .col(string(Users::Email).not_null().unique_key().to_owned())
                    .col(
                        string(Users::Plan)
                            .default("free")
                            .not_null()
                            .to_owned(),
                    )
                    .col(timestamp_with_time_zone_null(Users::PlanActivatedAt))
                    .col(timestamp_with_time_zone_null(Users::PlanPaidUntil))
                    .col(
                        timestamp_with_time_zone(Users::CreatedAt)
                            .default(Expr::current_timestamp())
                            .not_null()
                            .to_owned(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    Plan,
    PlanActivatedAt,
    PlanPaidUntil,
    CreatedAt,
}
