use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FundTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FundTransactions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FundTransactions::OrganizationId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FundTransactions::StrikeFundId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FundTransactions::TransactionType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FundTransactions::Amount)
                            .decimal()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FundTransactions::MemberId).integer().null())
                    .col(
                        ColumnDef::new(FundTransactions::Description)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(FundTransactions::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FundTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_fund_transactions_fund_occurred")
                    .table(FundTransactions::Table)
                    .col(FundTransactions::StrikeFundId)
                    .col(FundTransactions::OccurredAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FundTransactions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum FundTransactions {
    Table,
    Id,
    OrganizationId,
    StrikeFundId,
    TransactionType,
    Amount,
    MemberId,
    Description,
    OccurredAt,
    CreatedAt,
}
