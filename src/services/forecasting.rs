//! Burn-rate forecasting for strike funds.
//!
//! Derives a per-day cash-flow series from the fund transaction ledger,
//! detects seasonal patterns over the trailing year, and projects three
//! balance scenarios with depletion dates, recommendations, and
//! severity-tagged alerts. Forecasts are derived values: recomputed on
//! demand, never persisted.

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::collections::HashMap;

use crate::entities::{fund_transactions, prelude::*, strike_funds};
use crate::error::EngineError;
use crate::models::forecast::{
    AlertSeverity, BurnRateForecast, DailyCashFlow, ForecastAlert, ForecastScenario,
    ForecastScenarios, MonthlyPattern, ProjectedPoint,
};

/// Default projection window in days.
pub const DEFAULT_FORECAST_DAYS: u32 = 90;

/// Trailing window used to estimate current burn/donation rates.
const RATE_WINDOW_DAYS: i64 = 90;

/// Per-day cash-flow series for a fund over a date range. `balance` is
/// the running net change from the window start; `run_rate` is a 7-day
/// trailing average of withdrawals.
pub async fn get_historical_burn_rate(
    db: &DatabaseConnection,
    organization_id: &str,
    strike_fund_id: i32,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DailyCashFlow>, EngineError> {
    if end < start {
        return Err(EngineError::Validation(
            "endDate must not be before startDate".to_string(),
        ));
    }
    find_fund(db, organization_id, strike_fund_id).await?;

    let range_start = start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let range_end = end.and_hms_opt(23, 59, 59).unwrap_or_default().and_utc();

    let transactions = FundTransactions::find()
        .filter(fund_transactions::Column::OrganizationId.eq(organization_id))
        .filter(fund_transactions::Column::StrikeFundId.eq(strike_fund_id))
        .filter(fund_transactions::Column::OccurredAt.gte(range_start))
        .filter(fund_transactions::Column::OccurredAt.lte(range_end))
        .all(db)
        .await?;

    Ok(build_daily_series(&transactions, start, end))
}

/// Merge transactions into one entry per calendar day across the range.
pub fn build_daily_series(
    transactions: &[fund_transactions::Model],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<DailyCashFlow> {
    let mut deposits_by_day: HashMap<NaiveDate, f64> = HashMap::new();
    let mut withdrawals_by_day: HashMap<NaiveDate, f64> = HashMap::new();

    for tx in transactions {
        let day = tx.occurred_at.date_naive();
        let amount = tx.amount.to_f64().unwrap_or(0.0);
        if tx.transaction_type.is_deposit() {
            *deposits_by_day.entry(day).or_default() += amount;
        } else {
            *withdrawals_by_day.entry(day).or_default() += amount;
        }
    }

    let mut series = Vec::new();
    let mut balance = 0.0;
    let mut date = start;

    while date <= end {
        let deposits = deposits_by_day.get(&date).copied().unwrap_or(0.0);
        let withdrawals = withdrawals_by_day.get(&date).copied().unwrap_or(0.0);
        let net_change = deposits - withdrawals;
        balance += net_change;

        series.push(DailyCashFlow {
            date,
            deposits,
            withdrawals,
            net_change,
            balance,
            run_rate: 0.0,
        });

        date += chrono::Duration::days(1);
    }

    // 7-day trailing moving average of withdrawals, including the day itself.
    for i in 0..series.len() {
        let window_start = i.saturating_sub(6);
        let window = &series[window_start..=i];
        let total: f64 = window.iter().map(|d| d.withdrawals).sum();
        series[i].run_rate = total / window.len() as f64;
    }

    series
}

/// Seasonal burn/donation averages per calendar month (0-11) over the
/// trailing 12 months. Months with no data stay at zero.
pub async fn detect_seasonal_patterns(
    db: &DatabaseConnection,
    organization_id: &str,
    strike_fund_id: i32,
) -> Result<Vec<MonthlyPattern>, EngineError> {
    let today = Utc::now().date_naive();
    let series = get_historical_burn_rate(
        db,
        organization_id,
        strike_fund_id,
        today - chrono::Duration::days(365),
        today,
    )
    .await?;
    Ok(seasonal_patterns(&series))
}

/// Group a daily series by calendar month: mean burn rate (withdrawals),
/// mean donations, and burn-rate variance across that month's days.
pub fn seasonal_patterns(series: &[DailyCashFlow]) -> Vec<MonthlyPattern> {
    let mut by_month: Vec<Vec<&DailyCashFlow>> = vec![Vec::new(); 12];
    for day in series {
        by_month[day.date.month0() as usize].push(day);
    }

    by_month
        .into_iter()
        .enumerate()
        .map(|(month, days)| {
            if days.is_empty() {
                return MonthlyPattern {
                    month: month as u32,
                    avg_burn_rate: 0.0,
                    avg_donations: 0.0,
                    variance: 0.0,
                };
            }
            let n = days.len() as f64;
            let avg_burn_rate = days.iter().map(|d| d.withdrawals).sum::<f64>() / n;
            let avg_donations = days.iter().map(|d| d.deposits).sum::<f64>() / n;
            let variance = days
                .iter()
                .map(|d| (d.withdrawals - avg_burn_rate).powi(2))
                .sum::<f64>()
                / n;
            MonthlyPattern {
                month: month as u32,
                avg_burn_rate,
                avg_donations,
                variance,
            }
        })
        .collect()
}

/// Inputs for one scenario simulation.
#[derive(Debug, Clone)]
pub struct ScenarioInputs<'a> {
    pub label: &'a str,
    pub start_date: NaiveDate,
    pub start_balance: f64,
    pub daily_burn: f64,
    pub daily_donations: f64,
    /// Extra lump-sum withdrawal injected every 7th simulated day,
    /// modeling the batched weekly stipend payout.
    pub weekly_payout: f64,
    pub seasonal: &'a [MonthlyPattern],
    pub variance: f64,
    pub forecast_days: u32,
}

/// Simulate a balance trajectory day by day. The projected series holds
/// at most forecast_days + 1 points; the loop exits the instant the raw
/// balance crosses zero. When the balance survives the window but net
/// burn is still positive, the depletion date is extrapolated from the
/// average net daily outflow.
pub fn generate_scenario(inputs: &ScenarioInputs) -> ForecastScenario {
    let burn_baseline = baseline(inputs.seasonal, |m| m.avg_burn_rate);
    let donation_baseline = baseline(inputs.seasonal, |m| m.avg_donations);

    let mut balance = inputs.start_balance;
    let mut projected_balance = vec![ProjectedPoint {
        date: inputs.start_date,
        balance: balance.max(0.0),
    }];
    let mut depletion_date = None;
    let mut days_remaining = None;

    for day in 1..=inputs.forecast_days {
        let date = inputs.start_date + chrono::Duration::days(day as i64);
        let month = &inputs.seasonal[date.month0() as usize];

        let burn_factor = seasonal_factor(month.avg_burn_rate, burn_baseline);
        let donation_factor = seasonal_factor(month.avg_donations, donation_baseline);

        let mut outflow = inputs.daily_burn * burn_factor;
        if day % 7 == 0 {
            outflow += inputs.weekly_payout;
        }
        let inflow = inputs.daily_donations * donation_factor;

        balance += inflow - outflow;
        projected_balance.push(ProjectedPoint {
            date,
            balance: balance.max(0.0),
        });

        if balance <= 0.0 {
            depletion_date = Some(date);
            days_remaining = Some(day);
            break;
        }
    }

    if depletion_date.is_none() {
        let net_daily =
            inputs.daily_burn + inputs.weekly_payout / 7.0 - inputs.daily_donations;
        if net_daily > 0.0 && inputs.start_balance > 0.0 {
            let days = (inputs.start_balance / net_daily).ceil() as u32;
            depletion_date = Some(inputs.start_date + chrono::Duration::days(days as i64));
            days_remaining = Some(days);
        }
    }

    ForecastScenario {
        label: inputs.label.to_string(),
        daily_burn: inputs.daily_burn,
        daily_donations: inputs.daily_donations,
        projected_balance,
        depletion_date,
        days_remaining,
        confidence: (1.0 - inputs.variance / 100.0).max(0.5),
        assumptions: vec![
            format!("daily burn rate ${:.2}", inputs.daily_burn),
            format!("daily donations ${:.2}", inputs.daily_donations),
            format!("weekly stipend payout ${:.2}", inputs.weekly_payout),
            format!("seasonal variance {:.2}", inputs.variance),
        ],
    }
}

fn baseline(seasonal: &[MonthlyPattern], value: impl Fn(&MonthlyPattern) -> f64) -> f64 {
    let populated: Vec<f64> = seasonal
        .iter()
        .map(&value)
        .filter(|v| *v > 0.0)
        .collect();
    if populated.is_empty() {
        0.0
    } else {
        populated.iter().sum::<f64>() / populated.len() as f64
    }
}

fn seasonal_factor(month_avg: f64, baseline: f64) -> f64 {
    if baseline > 0.0 && month_avg > 0.0 {
        month_avg / baseline
    } else {
        1.0
    }
}

/// Full forecast: three scenarios from one realistic rate pair, scaled
/// burn x0.7/1.0/1.3 and donations x1.3/1.0/0.7.
pub async fn generate_forecast(
    db: &DatabaseConnection,
    organization_id: &str,
    strike_fund_id: i32,
    forecast_days: u32,
) -> Result<BurnRateForecast, EngineError> {
    let fund = find_fund(db, organization_id, strike_fund_id).await?;
    let today = Utc::now().date_naive();

    let series = get_historical_burn_rate(
        db,
        organization_id,
        strike_fund_id,
        today - chrono::Duration::days(RATE_WINDOW_DAYS),
        today,
    )
    .await?;
    let seasonal = detect_seasonal_patterns(db, organization_id, strike_fund_id).await?;

    let days = series.len().max(1) as f64;
    let daily_burn = series.iter().map(|d| d.withdrawals).sum::<f64>() / days;
    let daily_donations = series.iter().map(|d| d.deposits).sum::<f64>() / days;
    let variance = seasonal[today.month0() as usize].variance;

    let current_balance = fund.current_balance.to_f64().unwrap_or(0.0);
    let weekly_payout = fund
        .weekly_stipend_amount
        .and_then(|d| d.to_f64())
        .unwrap_or(0.0);

    let scenario = |label: &str, burn_scale: f64, donation_scale: f64| {
        generate_scenario(&ScenarioInputs {
            label,
            start_date: today,
            start_balance: current_balance,
            daily_burn: daily_burn * burn_scale,
            daily_donations: daily_donations * donation_scale,
            weekly_payout,
            seasonal: &seasonal,
            variance,
            forecast_days,
        })
    };

    let scenarios = ForecastScenarios {
        optimistic: scenario("optimistic", 0.7, 1.3),
        realistic: scenario("realistic", 1.0, 1.0),
        pessimistic: scenario("pessimistic", 1.3, 0.7),
    };

    let target_balance = fund.target_balance.and_then(|d| d.to_f64());
    let recommendations = build_recommendations(
        current_balance,
        target_balance,
        daily_burn,
        daily_donations,
        &scenarios,
    );
    let alerts = build_alerts(&fund.name, current_balance, daily_burn, &scenarios);

    Ok(BurnRateForecast {
        strike_fund_id,
        generated_at: Utc::now(),
        current_balance,
        historical_burn_rate: daily_burn,
        historical_donation_rate: daily_donations,
        scenarios,
        recommendations,
        alerts,
    })
}

/// Rule-based recommendations; falls back to a healthy-fund message so
/// the list is never empty.
pub fn build_recommendations(
    current_balance: f64,
    target_balance: Option<f64>,
    daily_burn: f64,
    daily_donations: f64,
    scenarios: &ForecastScenarios,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if let Some(target) = target_balance {
        if target > 0.0 {
            let ratio = current_balance / target;
            if ratio < 0.25 {
                recommendations.push(
                    "Fund is below 25% of target: launch an emergency fundraising drive"
                        .to_string(),
                );
            } else if ratio < 0.5 {
                recommendations.push(
                    "Fund is below 50% of target: step up donation outreach".to_string(),
                );
            }
        }
    }

    if let Some(days) = scenarios.realistic.days_remaining {
        if days < 30 {
            recommendations.push(format!(
                "Projected depletion in {} days: reduce stipend rates or pause non-essential disbursements",
                days
            ));
        } else if days < 90 {
            recommendations.push(format!(
                "Projected depletion in {} days: review weekly stipend commitments",
                days
            ));
        }
    }

    if daily_donations > 0.0 && daily_burn > daily_donations * 1.5 {
        recommendations.push(
            "Burn rate exceeds donations by more than 50%: spending is outpacing fundraising"
                .to_string(),
        );
    }

    if recommendations.is_empty() {
        recommendations.push("Fund is healthy at current burn and donation rates".to_string());
    }

    recommendations
}

/// Severity-tagged alert events for the notification collaborator.
pub fn build_alerts(
    fund_name: &str,
    current_balance: f64,
    daily_burn: f64,
    scenarios: &ForecastScenarios,
) -> Vec<ForecastAlert> {
    let mut alerts = Vec::new();

    if let Some(days) = scenarios.pessimistic.days_remaining {
        if days < 30 {
            alerts.push(ForecastAlert {
                severity: AlertSeverity::Critical,
                message: format!(
                    "{}: pessimistic projection depletes the fund in {} days",
                    fund_name, days
                ),
                days_remaining: Some(days),
            });
        }
    }

    if let Some(days) = scenarios.realistic.days_remaining {
        if days < 60 {
            alerts.push(ForecastAlert {
                severity: AlertSeverity::Warning,
                message: format!(
                    "{}: realistic projection depletes the fund in {} days",
                    fund_name, days
                ),
                days_remaining: Some(days),
            });
        }
    }

    if daily_burn > 0.0 {
        let runway = (current_balance / daily_burn) as u32;
        if runway < 45 {
            alerts.push(ForecastAlert {
                severity: AlertSeverity::Warning,
                message: format!(
                    "{}: only {} days of runway at the current burn rate",
                    fund_name, runway
                ),
                days_remaining: Some(runway),
            });
        }
    }

    if alerts.is_empty() {
        alerts.push(ForecastAlert {
            severity: AlertSeverity::Info,
            message: format!("{}: projections are healthy", fund_name),
            days_remaining: scenarios.realistic.days_remaining,
        });
    }

    alerts
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    use fund_transactions::FundTransactionType;

    fn flat_seasonal() -> Vec<MonthlyPattern> {
        (0..12)
            .map(|month| MonthlyPattern {
                month,
                avg_burn_rate: 0.0,
                avg_donations: 0.0,
                variance: 0.0,
            })
            .collect()
    }

    fn tx(
        fund_id: i32,
        kind: FundTransactionType,
        amount: i64,
        date: NaiveDate,
    ) -> fund_transactions::Model {
        fund_transactions::Model {
            id: 0,
            organization_id: "org_test".to_string(),
            strike_fund_id: fund_id,
            transaction_type: kind,
            amount: Decimal::from(amount),
            member_id: None,
            description: None,
            occurred_at: Utc
                .from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
                .into(),
            created_at: None,
        }
    }

    #[test]
    fn daily_series_accumulates_balance_and_run_rate() {
        let start = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let transactions = vec![
            tx(1, FundTransactionType::Donation, 500, start),
            tx(1, FundTransactionType::StipendPayment, 100, start),
            tx(1, FundTransactionType::StipendPayment, 100, start + chrono::Duration::days(1)),
            tx(1, FundTransactionType::DuesPayment, 50, start + chrono::Duration::days(2)),
        ];

        let series = build_daily_series(&transactions, start, start + chrono::Duration::days(2));
        assert_eq!(series.len(), 3);

        assert_eq!(series[0].deposits, 500.0);
        assert_eq!(series[0].withdrawals, 100.0);
        assert_eq!(series[0].balance, 400.0);
        assert_eq!(series[0].run_rate, 100.0);

        assert_eq!(series[1].balance, 300.0);
        assert_eq!(series[1].run_rate, 100.0);

        assert_eq!(series[2].deposits, 50.0);
        assert_eq!(series[2].balance, 350.0);
        // (100 + 100 + 0) / 3
        assert!((series[2].run_rate - 66.6666).abs() < 0.01);
    }

    #[test]
    fn seasonal_patterns_zero_fill_empty_months() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let transactions = vec![
            tx(1, FundTransactionType::StipendPayment, 200, start),
            tx(1, FundTransactionType::StipendPayment, 400, start + chrono::Duration::days(1)),
        ];
        let series = build_daily_series(&transactions, start, start + chrono::Duration::days(1));
        let patterns = seasonal_patterns(&series);

        assert_eq!(patterns.len(), 12);
        // March (month0 == 2) has data
        assert_eq!(patterns[2].avg_burn_rate, 300.0);
        assert_eq!(patterns[2].variance, 10_000.0);
        // Everything else defaults to zero
        assert_eq!(patterns[0].avg_burn_rate, 0.0);
        assert_eq!(patterns[7].variance, 0.0);
    }

    #[test]
    fn scenario_depletes_in_two_hundred_days() {
        // $10,000 at $200/day burn and $150/day donations nets -$50/day:
        // depletion on day 200, beyond the 90-day projection window.
        let start = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let seasonal = flat_seasonal();
        let scenario = generate_scenario(&ScenarioInputs {
            label: "realistic",
            start_date: start,
            start_balance: 10_000.0,
            daily_burn: 200.0,
            daily_donations: 150.0,
            weekly_payout: 0.0,
            seasonal: &seasonal,
            variance: 0.0,
            forecast_days: DEFAULT_FORECAST_DAYS,
        });

        assert_eq!(scenario.days_remaining, Some(200));
        assert_eq!(
            scenario.depletion_date,
            Some(start + chrono::Duration::days(200))
        );
        assert_eq!(scenario.projected_balance.len(), 91);
        assert_eq!(scenario.confidence, 1.0);
    }

    #[test]
    fn scenario_depletion_inside_window_stops_the_loop() {
        let start = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let seasonal = flat_seasonal();
        let scenario = generate_scenario(&ScenarioInputs {
            label: "pessimistic",
            start_date: start,
            start_balance: 1_000.0,
            daily_burn: 100.0,
            daily_donations: 0.0,
            weekly_payout: 0.0,
            seasonal: &seasonal,
            variance: 0.0,
            forecast_days: DEFAULT_FORECAST_DAYS,
        });

        assert_eq!(scenario.days_remaining, Some(10));
        assert_eq!(scenario.projected_balance.len(), 11);
        // Display balance never goes negative
        assert!(scenario.projected_balance.iter().all(|p| p.balance >= 0.0));
    }

    #[test]
    fn scenario_with_zero_rates_terminates_without_depletion() {
        let start = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let seasonal = flat_seasonal();
        let scenario = generate_scenario(&ScenarioInputs {
            label: "realistic",
            start_date: start,
            start_balance: 5_000.0,
            daily_burn: 0.0,
            daily_donations: 0.0,
            weekly_payout: 0.0,
            seasonal: &seasonal,
            variance: 0.0,
            forecast_days: DEFAULT_FORECAST_DAYS,
        });

        assert!(scenario.depletion_date.is_none());
        assert!(scenario.days_remaining.is_none());
        assert_eq!(scenario.projected_balance.len(), 91);
    }

    #[test]
    fn weekly_payout_accelerates_depletion() {
        let start = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let seasonal = flat_seasonal();
        let base = ScenarioInputs {
            label: "realistic",
            start_date: start,
            start_balance: 10_000.0,
            daily_burn: 200.0,
            daily_donations: 150.0,
            weekly_payout: 0.0,
            seasonal: &seasonal,
            variance: 0.0,
            forecast_days: DEFAULT_FORECAST_DAYS,
        };
        let without = generate_scenario(&base);
        let with = generate_scenario(&ScenarioInputs {
            weekly_payout: 700.0,
            ..base
        });

        assert!(with.days_remaining.unwrap() < without.days_remaining.unwrap());
    }

    #[test]
    fn confidence_floors_at_half() {
        let start = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let seasonal = flat_seasonal();
        let scenario = generate_scenario(&ScenarioInputs {
            label: "realistic",
            start_date: start,
            start_balance: 1_000.0,
            daily_burn: 10.0,
            daily_donations: 0.0,
            weekly_payout: 0.0,
            seasonal: &seasonal,
            variance: 90.0,
            forecast_days: DEFAULT_FORECAST_DAYS,
        });
        assert_eq!(scenario.confidence, 0.5);
    }

    fn scenario_with_days(days: Option<u32>) -> ForecastScenario {
        ForecastScenario {
            label: "test".to_string(),
            daily_burn: 100.0,
            daily_donations: 50.0,
            projected_balance: vec![],
            depletion_date: None,
            days_remaining: days,
            confidence: 1.0,
            assumptions: vec![],
        }
    }

    #[test]
    fn critical_alert_on_imminent_pessimistic_depletion() {
        let scenarios = ForecastScenarios {
            optimistic: scenario_with_days(Some(120)),
            realistic: scenario_with_days(Some(70)),
            pessimistic: scenario_with_days(Some(20)),
        };
        let alerts = build_alerts("Local 100", 50_000.0, 100.0, &scenarios);
        assert!(alerts
            .iter()
            .any(|a| a.severity == AlertSeverity::Critical));
    }

    #[test]
    fn warning_alert_on_short_realistic_depletion() {
        let scenarios = ForecastScenarios {
            optimistic: scenario_with_days(None),
            realistic: scenario_with_days(Some(45)),
            pessimistic: scenario_with_days(Some(40)),
        };
        let alerts = build_alerts("Local 100", 50_000.0, 100.0, &scenarios);
        assert!(alerts.iter().all(|a| a.severity != AlertSeverity::Critical));
        assert!(alerts.iter().any(|a| a.severity == AlertSeverity::Warning));
    }

    #[test]
    fn healthy_fund_gets_info_alert_and_fallback_recommendation() {
        let scenarios = ForecastScenarios {
            optimistic: scenario_with_days(None),
            realistic: scenario_with_days(None),
            pessimistic: scenario_with_days(Some(300)),
        };
        let alerts = build_alerts("Local 100", 100_000.0, 100.0, &scenarios);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Info);

        let recommendations =
            build_recommendations(100_000.0, Some(100_000.0), 100.0, 100.0, &scenarios);
        assert_eq!(recommendations.len(), 1);
        assert!(recommendations[0].contains("healthy"));
    }

    #[test]
    fn low_balance_ratio_drives_fundraising_recommendation() {
        let scenarios = ForecastScenarios {
            optimistic: scenario_with_days(None),
            realistic: scenario_with_days(None),
            pessimistic: scenario_with_days(None),
        };
        let recommendations =
            build_recommendations(10_000.0, Some(50_000.0), 100.0, 100.0, &scenarios);
        assert!(recommendations
            .iter()
            .any(|r| r.contains("emergency fundraising")));
    }
}
