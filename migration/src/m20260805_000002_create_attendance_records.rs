use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AttendanceRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AttendanceRecords::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::OrganizationId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::StrikeFundId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::MemberId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::CheckInTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::CheckOutTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::CheckInMethod)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::CheckInLatitude)
                            .double()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::CheckInLongitude)
                            .double()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::CheckOutLatitude)
                            .double()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::CheckOutLongitude)
                            .double()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::LocationVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::CoordinatorOverride)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::OverrideReason)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::HoursWorked)
                            .decimal()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_attendance_org_fund_member")
                    .table(AttendanceRecords::Table)
                    .col(AttendanceRecords::OrganizationId)
                    .col(AttendanceRecords::StrikeFundId)
                    .col(AttendanceRecords::MemberId)
                    .to_owned(),
            )
            .await?;

        // One open shift per (org, fund, member). sea-query's Index builder
        // has no WHERE clause, so the partial unique index is raw SQL.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS uniq_attendance_open_shift \
                 ON attendance_records (organization_id, strike_fund_id, member_id) \
                 WHERE check_out_time IS NULL",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AttendanceRecords::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AttendanceRecords {
    Table,
    Id,
    OrganizationId,
    StrikeFundId,
    MemberId,
    CheckInTime,
    CheckOutTime,
    CheckInMethod,
    CheckInLatitude,
    CheckInLongitude,
    CheckOutLatitude,
    CheckOutLongitude,
    LocationVerified,
    CoordinatorOverride,
    OverrideReason,
    HoursWorked,
    CreatedAt,
    UpdatedAt,
}
