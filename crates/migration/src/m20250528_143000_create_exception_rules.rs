use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ExceptionRules::Table)
                    .if_not_exists()
                    .col(pk_uuid(ExceptionRules::Id))
                    .col(string(ExceptionRules::Name).not_null().to_owned())
                    .col(string(ExceptionRules::StatusMatch).not_null().to_owned())
                    .col(
                        string(ExceptionRules::Severity)
                            .default("medium")
                            .not_null()
                            .to_owned(),
                    )
                    .col(
                        boolean(ExceptionRules::Notify)
                            .default(true)
                            .not_null()
                            .to_owned(),
                    )
                    .col(
                        timestamp_with_time_zone(ExceptionRules::CreatedAt)
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
            .drop_table(Table::drop().table(ExceptionRules::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ExceptionRules {
    Table,
    Id,
    Name,
    StatusMatch,
    Severity,
    Notify,
    CreatedAt,
}
