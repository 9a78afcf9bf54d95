use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DuesTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DuesTransactions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DuesTransactions::OrganizationId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DuesTransactions::MemberId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DuesTransactions::Amount)
                            .decimal()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DuesTransactions::TotalAmount)
                            .decimal()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DuesTransactions::LateFeeAmount)
                            .decimal()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DuesTransactions::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(DuesTransactions::DueDate).date().not_null())
                    .col(
                        ColumnDef::new(DuesTransactions::PaidAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DuesTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(DuesTransactions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_dues_org_status_due")
                    .table(DuesTransactions::Table)
                    .col(DuesTransactions::OrganizationId)
                    .col(DuesTransactions::Status)
                    .col(DuesTransactions::DueDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DuesTransactions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum DuesTransactions {
    Table,
    Id,
    OrganizationId,
    MemberId,
    Amount,
    TotalAmount,
    LateFeeAmount,
    Status,
    DueDate,
    PaidAt,
    CreatedAt,
    UpdatedAt,
}
