use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ArrearsCases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ArrearsCases::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ArrearsCases::OrganizationId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ArrearsCases::CaseNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ArrearsCases::MemberId).integer().not_null())
                    .col(
                        ColumnDef::new(ArrearsCases::TransactionIds)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ArrearsCases::TotalOwed).decimal().not_null())
                    .col(
                        ColumnDef::new(ArrearsCases::RemainingBalance)
                            .decimal()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ArrearsCases::OldestDebtDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ArrearsCases::DaysOverdue)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ArrearsCases::EscalationLevel)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(ArrearsCases::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(ArrearsCases::ContactHistory)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ArrearsCases::PaymentSchedule)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ArrearsCases::ResolvedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ArrearsCases::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(ArrearsCases::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        // One non-terminal case per (org, member); concurrent detection runs
        // must not open two cases for the same member.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS uniq_arrears_open_case \
                 ON arrears_cases (organization_id, member_id) \
                 WHERE status NOT IN ('resolved', 'written_off')",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ArrearsCases::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ArrearsCases {
    Table,
    Id,
    OrganizationId,
    CaseNumber,
    MemberId,
    TransactionIds,
    TotalOwed,
    RemainingBalance,
    OldestDebtDate,
    DaysOverdue,
    EscalationLevel,
    Status,
    ContactHistory,
    PaymentSchedule,
    ResolvedAt,
    CreatedAt,
    UpdatedAt,
}
