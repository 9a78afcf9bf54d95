use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StrikeFunds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StrikeFunds::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(StrikeFunds::OrganizationId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StrikeFunds::Name).string().not_null())
                    .col(
                        ColumnDef::new(StrikeFunds::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(StrikeFunds::CurrentBalance)
                            .decimal()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(StrikeFunds::TargetBalance).decimal().null())
                    .col(
                        ColumnDef::new(StrikeFunds::WeeklyStipendAmount)
                            .decimal()
                            .null(),
                    )
                    .col(ColumnDef::new(StrikeFunds::MinimumHours).decimal().null())
                    .col(ColumnDef::new(StrikeFunds::PicketLatitude).double().null())
                    .col(ColumnDef::new(StrikeFunds::PicketLongitude).double().null())
                    .col(
                        ColumnDef::new(StrikeFunds::CheckinRadiusMeters)
                            .double()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StrikeFunds::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(StrikeFunds::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_strike_funds_org")
                    .table(StrikeFunds::Table)
                    .col(StrikeFunds::OrganizationId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StrikeFunds::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum StrikeFunds {
    Table,
    Id,
    OrganizationId,
    Name,
    Status,
    CurrentBalance,
    TargetBalance,
    WeeklyStipendAmount,
    MinimumHours,
    PicketLatitude,
    PicketLongitude,
    CheckinRadiusMeters,
    CreatedAt,
    UpdatedAt,
}
