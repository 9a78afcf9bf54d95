//! Attendance ledger: the check-in/check-out state machine.
//!
//! Per (fund, member) the machine is NoOpenShift -> OpenShift ->
//! NoOpenShift. The storage layer backs the "at most one open shift"
//! invariant with a partial unique index, so a concurrent double
//! check-in loses at insert time rather than creating a second open row.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder,
    Set,
};
use std::collections::HashMap;

use crate::entities::{attendance_records, prelude::*, strike_funds};
use crate::error::{EngineError, TokenError};
use crate::models::attendance::{CheckInRequest, CoordinatorOverrideRequest, MemberAttendanceSummary};
use crate::services::{checkin_token, geo};

use attendance_records::CheckInMethod;

#[derive(Debug, Clone, PartialEq)]
pub struct CheckInOutcome {
    pub attendance_id: i32,
    pub location_verified: bool,
    pub distance_meters: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutOutcome {
    pub attendance_id: i32,
    pub hours_worked: Decimal,
    /// True when the shift was already closed; hours are the previously
    /// computed value and nothing was mutated.
    pub already_checked_out: bool,
}

/// Check a member in to a picket shift.
pub async fn check_in(
    db: &DatabaseConnection,
    organization_id: &str,
    request: &CheckInRequest,
) -> Result<CheckInOutcome, EngineError> {
    let fund = find_fund(db, organization_id, request.strike_fund_id).await?;
    let now = Utc::now();

    // GPS verification runs whenever coordinates and a picket location
    // are both known, regardless of the declared method.
    let mut location_verified = false;
    let mut distance_meters = None;

    if let (Some(lat), Some(lon)) = (request.latitude, request.longitude) {
        if let (Some(picket_lat), Some(picket_lon)) =
            (fund.picket_latitude, fund.picket_longitude)
        {
            let radius = fund
                .checkin_radius_meters
                .unwrap_or(geo::DEFAULT_CHECKIN_RADIUS_METERS);
            let verification = geo::verify_location(
                geo::Coordinates {
                    latitude: lat,
                    longitude: lon,
                },
                geo::Coordinates {
                    latitude: picket_lat,
                    longitude: picket_lon,
                },
                radius,
            );
            distance_meters = Some(verification.distance_meters);

            if verification.verified {
                location_verified = true;
            } else if !request.coordinator_override {
                return Err(EngineError::LocationRejected {
                    distance_meters: verification.distance_meters,
                    allowed_radius_meters: radius,
                });
            }
        }
    }

    if request.method == CheckInMethod::QrCode {
        let token = request.qr_token.as_deref().ok_or_else(|| {
            EngineError::Validation("qrToken is required for qr_code check-in".to_string())
        })?;
        let claims = checkin_token::validate_token(token, now)?;
        if claims.fund_id != request.strike_fund_id || claims.member_id != request.member_id {
            return Err(TokenError::Mismatch.into());
        }
    }

    if let Some(open) = find_open_shift(db, organization_id, request.strike_fund_id, request.member_id).await? {
        return Err(EngineError::AlreadyCheckedIn {
            attendance_id: open.id,
        });
    }

    let record = attendance_records::ActiveModel {
        organization_id: Set(organization_id.to_string()),
        strike_fund_id: Set(request.strike_fund_id),
        member_id: Set(request.member_id),
        check_in_time: Set(now.into()),
        check_in_method: Set(request.method),
        check_in_latitude: Set(request.latitude),
        check_in_longitude: Set(request.longitude),
        location_verified: Set(location_verified),
        coordinator_override: Set(request.coordinator_override),
        override_reason: Set(request.override_reason.clone()),
        created_at: Set(Some(now.into())),
        updated_at: Set(Some(now.into())),
        ..Default::default()
    };

    let inserted = match record.insert(db).await {
        Ok(model) => model,
        // A concurrent check-in won the race against the partial unique
        // index; report the surviving open shift instead of a 500.
        Err(e) if e.to_string().contains("uniq_attendance_open_shift") => {
            let open =
                find_open_shift(db, organization_id, request.strike_fund_id, request.member_id)
                    .await?;
            return match open {
                Some(existing) => Err(EngineError::AlreadyCheckedIn {
                    attendance_id: existing.id,
                }),
                None => Err(EngineError::Db(e)),
            };
        }
        Err(e) => return Err(EngineError::Db(e)),
    };

    tracing::info!(
        "Member {} checked in to fund {} (record {}, method {:?}, verified={})",
        request.member_id,
        request.strike_fund_id,
        inserted.id,
        request.method,
        location_verified
    );

    Ok(CheckInOutcome {
        attendance_id: inserted.id,
        location_verified,
        distance_meters,
    })
}

/// Close a shift and compute hours worked. Idempotent: a second call on
/// a closed shift returns the previously computed hours.
pub async fn check_out(
    db: &DatabaseConnection,
    organization_id: &str,
    attendance_id: i32,
    coordinates: Option<(f64, f64)>,
) -> Result<CheckOutOutcome, EngineError> {
    let record = AttendanceRecords::find_by_id(attendance_id)
        .filter(attendance_records::Column::OrganizationId.eq(organization_id))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound {
            entity: "attendance record",
            id: attendance_id.to_string(),
        })?;

    if record.check_out_time.is_some() {
        return Ok(CheckOutOutcome {
            attendance_id,
            hours_worked: record.hours_worked.unwrap_or(Decimal::ZERO),
            already_checked_out: true,
        });
    }

    let now = Utc::now();
    let hours_worked = hours_between(record.check_in_time.into(), now);

    let mut active: attendance_records::ActiveModel = record.into();
    active.check_out_time = Set(Some(now.into()));
    active.hours_worked = Set(Some(hours_worked));
    if let Some((lat, lon)) = coordinates {
        active.check_out_latitude = Set(Some(lat));
        active.check_out_longitude = Set(Some(lon));
    }
    active.updated_at = Set(Some(now.into()));
    active.update(db).await?;

    tracing::info!(
        "Attendance record {} checked out ({} hours)",
        attendance_id,
        hours_worked
    );

    Ok(CheckOutOutcome {
        attendance_id,
        hours_worked,
        already_checked_out: false,
    })
}

/// Record a shift a coordinator verified out-of-band (GPS/QR failed or
/// unavailable). Creates a closed record with synthetic times `hours`
/// apart ending now.
pub async fn coordinator_override(
    db: &DatabaseConnection,
    organization_id: &str,
    request: &CoordinatorOverrideRequest,
) -> Result<attendance_records::Model, EngineError> {
    if request.hours <= Decimal::ZERO {
        return Err(EngineError::Validation(
            "override hours must be positive".to_string(),
        ));
    }
    find_fund(db, organization_id, request.strike_fund_id).await?;

    let now = Utc::now();
    let seconds = (request.hours * Decimal::from(3600))
        .trunc()
        .to_i64()
        .unwrap_or(0);
    let check_in_time = now - Duration::seconds(seconds);

    let record = attendance_records::ActiveModel {
        organization_id: Set(organization_id.to_string()),
        strike_fund_id: Set(request.strike_fund_id),
        member_id: Set(request.member_id),
        check_in_time: Set(check_in_time.into()),
        check_out_time: Set(Some(now.into())),
        check_in_method: Set(CheckInMethod::Manual),
        location_verified: Set(true),
        coordinator_override: Set(true),
        override_reason: Set(Some(format!(
            "{} (verified by {})",
            request.reason, request.verified_by
        ))),
        hours_worked: Set(Some(request.hours.round_dp(2))),
        created_at: Set(Some(now.into())),
        updated_at: Set(Some(now.into())),
        ..Default::default()
    };

    let inserted = record.insert(db).await?;

    tracing::info!(
        "Coordinator override: member {} credited {} hours on fund {} by {}",
        request.member_id,
        request.hours,
        request.strike_fund_id,
        request.verified_by
    );

    Ok(inserted)
}

/// Open shifts for a fund, oldest first.
pub async fn get_active_checkins(
    db: &DatabaseConnection,
    organization_id: &str,
    strike_fund_id: i32,
) -> Result<Vec<attendance_records::Model>, EngineError> {
    let records = AttendanceRecords::find()
        .filter(attendance_records::Column::OrganizationId.eq(organization_id))
        .filter(attendance_records::Column::StrikeFundId.eq(strike_fund_id))
        .filter(attendance_records::Column::CheckOutTime.is_null())
        .order_by(attendance_records::Column::CheckInTime, Order::Asc)
        .all(db)
        .await?;
    Ok(records)
}

/// Shift history within a date range, optionally for a single member.
pub async fn get_history(
    db: &DatabaseConnection,
    organization_id: &str,
    strike_fund_id: i32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    member_id: Option<i32>,
) -> Result<Vec<attendance_records::Model>, EngineError> {
    let mut query = AttendanceRecords::find()
        .filter(attendance_records::Column::OrganizationId.eq(organization_id))
        .filter(attendance_records::Column::StrikeFundId.eq(strike_fund_id))
        .filter(attendance_records::Column::CheckInTime.gte(start))
        .filter(attendance_records::Column::CheckInTime.lte(end));

    if let Some(member_id) = member_id {
        query = query.filter(attendance_records::Column::MemberId.eq(member_id));
    }

    let records = query
        .order_by(attendance_records::Column::CheckInTime, Order::Desc)
        .all(db)
        .await?;
    Ok(records)
}

/// Per-member summaries over closed shifts in the range.
pub async fn get_member_summaries(
    db: &DatabaseConnection,
    organization_id: &str,
    strike_fund_id: i32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    member_id: Option<i32>,
) -> Result<Vec<MemberAttendanceSummary>, EngineError> {
    let records = get_history(db, organization_id, strike_fund_id, start, end, member_id).await?;
    Ok(summarize_shifts(&records))
}

/// Group closed shifts by member. Open shifts contribute nothing.
pub fn summarize_shifts(records: &[attendance_records::Model]) -> Vec<MemberAttendanceSummary> {
    let mut by_member: HashMap<i32, MemberAttendanceSummary> = HashMap::new();

    for record in records {
        if record.check_out_time.is_none() {
            continue;
        }
        let hours = record.hours_worked.unwrap_or(Decimal::ZERO);
        let entry = by_member
            .entry(record.member_id)
            .or_insert(MemberAttendanceSummary {
                member_id: record.member_id,
                total_hours: Decimal::ZERO,
                shift_count: 0,
                average_hours_per_shift: Decimal::ZERO,
                last_check_in: record.check_in_time,
            });
        entry.total_hours += hours;
        entry.shift_count += 1;
        if record.check_in_time > entry.last_check_in {
            entry.last_check_in = record.check_in_time;
        }
    }

    let mut summaries: Vec<MemberAttendanceSummary> = by_member
        .into_values()
        .map(|mut s| {
            s.average_hours_per_shift = (s.total_hours / Decimal::from(s.shift_count)).round_dp(2);
            s.total_hours = s.total_hours.round_dp(2);
            s
        })
        .collect();
    summaries.sort_by_key(|s| s.member_id);
    summaries
}

/// Duration between check-in and check-out as hours, 2 decimal places.
pub fn hours_between(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> Decimal {
    let seconds = (check_out - check_in).num_seconds().max(0);
    (Decimal::from(seconds) / Decimal::from(3600)).round_dp(2)
}

async fn find_fund(
    db: &DatabaseConnection,
    organization_id: &str,
    strike_fund_id: i32,
) -> Result<strike_funds::Model, EngineError> {
    StrikeFunds::find_by_id(strike_fund_id)
        .filter(strike_funds::Column::OrganizationId.eq(organization_id))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound {
            entity: "strike fund",
            id: strike_fund_id.to_string(),
        })
}

async fn find_open_shift(
    db: &DatabaseConnection,
    organization_id: &str,
    strike_fund_id: i32,
    member_id: i32,
) -> Result<Option<attendance_records::Model>, EngineError> {
    let open = AttendanceRecords::find()
        .filter(attendance_records::Column::OrganizationId.eq(organization_id))
        .filter(attendance_records::Column::StrikeFundId.eq(strike_fund_id))
        .filter(attendance_records::Column::MemberId.eq(member_id))
        .filter(attendance_records::Column::CheckOutTime.is_null())
        .one(db)
        .await?;
    Ok(open)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn shift(
        member_id: i32,
        check_in: DateTime<Utc>,
        hours: Option<Decimal>,
    ) -> attendance_records::Model {
        attendance_records::Model {
            id: 0,
            organization_id: "org_test".to_string(),
            strike_fund_id: 1,
            member_id,
            check_in_time: check_in.into(),
            check_out_time: hours.map(|_| check_in.into()),
            check_in_method: CheckInMethod::Gps,
            check_in_latitude: None,
            check_in_longitude: None,
            check_out_latitude: None,
            check_out_longitude: None,
            location_verified: true,
            coordinator_override: false,
            override_reason: None,
            hours_worked: hours,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn hours_are_rounded_to_two_decimals() {
        let check_in = Utc::now();
        let check_out = check_in + Duration::minutes(100);
        // 100 minutes = 1.6667 hours
        assert_eq!(hours_between(check_in, check_out), dec!(1.67));
    }

    #[test]
    fn negative_durations_clamp_to_zero() {
        let check_in = Utc::now();
        assert_eq!(
            hours_between(check_in, check_in - Duration::hours(1)),
            dec!(0)
        );
    }

    #[test]
    fn summaries_skip_open_shifts() {
        let now = Utc::now();
        let records = vec![
            shift(1, now - Duration::days(2), Some(dec!(4.0))),
            shift(1, now - Duration::days(1), Some(dec!(6.0))),
            shift(1, now, None), // still open
            shift(2, now, Some(dec!(3.5))),
        ];

        let summaries = summarize_shifts(&records);
        assert_eq!(summaries.len(), 2);

        let member1 = &summaries[0];
        assert_eq!(member1.member_id, 1);
        assert_eq!(member1.total_hours, dec!(10.0));
        assert_eq!(member1.shift_count, 2);
        assert_eq!(member1.average_hours_per_shift, dec!(5.0));

        let member2 = &summaries[1];
        assert_eq!(member2.shift_count, 1);
        assert_eq!(member2.total_hours, dec!(3.5));
    }

    #[test]
    fn summary_tracks_latest_check_in() {
        let now = Utc::now();
        let older = now - Duration::days(3);
        let records = vec![
            shift(1, older, Some(dec!(2.0))),
            shift(1, now, Some(dec!(2.0))),
        ];

        let summaries = summarize_shifts(&records);
        assert_eq!(summaries[0].last_check_in, now);
    }

    #[test]
    fn summaries_of_no_closed_shifts_are_empty() {
        let records = vec![shift(1, Utc::now(), None)];
        assert!(summarize_shifts(&records).is_empty());
    }

    fn fund_without_picket() -> strike_funds::Model {
        strike_funds::Model {
            id: 1,
            organization_id: "org_test".to_string(),
            name: "Local 100 Strike Fund".to_string(),
            status: strike_funds::FundStatus::Active,
            current_balance: dec!(10000),
            target_balance: None,
            weekly_stipend_amount: None,
            minimum_hours: None,
            picket_latitude: None,
            picket_longitude: None,
            checkin_radius_meters: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn second_check_in_reports_the_existing_open_shift() {
        use sea_orm::{DatabaseBackend, MockDatabase};

        let mut open = shift(1, Utc::now() - Duration::hours(2), None);
        open.id = 42;

        // fund lookup, then the open-shift lookup finds the live record
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![fund_without_picket()]])
            .append_query_results([vec![open]])
            .into_connection();

        let request = CheckInRequest {
            strike_fund_id: 1,
            member_id: 1,
            method: CheckInMethod::Manual,
            latitude: None,
            longitude: None,
            qr_token: None,
            coordinator_override: false,
            override_reason: None,
        };

        let err = check_in(&db, "org_test", &request).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::AlreadyCheckedIn { attendance_id: 42 }
        ));
    }

    #[tokio::test]
    async fn check_out_of_closed_shift_returns_prior_hours_without_writing() {
        use sea_orm::{DatabaseBackend, MockDatabase};

        let mut closed = shift(1, Utc::now() - Duration::hours(8), Some(dec!(6.5)));
        closed.id = 7;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![closed]])
            .into_connection();

        let outcome = check_out(&db, "org_test", 7, None).await.unwrap();
        assert!(outcome.already_checked_out);
        assert_eq!(outcome.attendance_id, 7);
        assert_eq!(outcome.hours_worked, dec!(6.5));

        // Only the lookup ran; the closed row was left untouched.
        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
    }
}
