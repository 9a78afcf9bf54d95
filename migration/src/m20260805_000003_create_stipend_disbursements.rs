use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StipendDisbursements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StipendDisbursements::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(StipendDisbursements::OrganizationId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StipendDisbursements::StrikeFundId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StipendDisbursements::MemberId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StipendDisbursements::Amount)
                            .decimal()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StipendDisbursements::WeekStartDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StipendDisbursements::WeekEndDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StipendDisbursements::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(StipendDisbursements::PaymentMethod)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StipendDisbursements::ApprovedBy)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StipendDisbursements::TransactionId)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(StipendDisbursements::Notes).string().null())
                    .col(
                        ColumnDef::new(StipendDisbursements::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(StipendDisbursements::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_disbursements_fund_week")
                    .table(StipendDisbursements::Table)
                    .col(StipendDisbursements::StrikeFundId)
                    .col(StipendDisbursements::WeekStartDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_disbursements_member")
                    .table(StipendDisbursements::Table)
                    .col(StipendDisbursements::MemberId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StipendDisbursements::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum StipendDisbursements {
    Table,
    Id,
    OrganizationId,
    StrikeFundId,
    MemberId,
    Amount,
    WeekStartDate,
    WeekEndDate,
    Status,
    PaymentMethod,
    ApprovedBy,
    TransactionId,
    Notes,
    CreatedAt,
    UpdatedAt,
}
