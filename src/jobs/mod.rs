use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};

use crate::entities::prelude::StrikeFunds;
use crate::entities::strike_funds;
use crate::error::EngineError;

pub mod arrears_detection_sync;
pub mod forecast_alerts_sync;
pub mod weekly_report_sync;

/// What one scheduled sweep did for a single organization.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepOutcome {
    pub funds_checked: u32,
    pub notifications_sent: u32,
}

/// Every organization with at least one strike fund. The jobs fan out
/// over this list so each tenant gets its own sweep.
pub async fn organization_ids(db: &DatabaseConnection) -> Result<Vec<String>, EngineError> {
    let ids: Vec<String> = StrikeFunds::find()
        .select_only()
        .column(strike_funds::Column::OrganizationId)
        .distinct()
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids)
}

/// Active funds for one organization, the population every sweep walks.
pub(crate) async fn active_funds(
    db: &DatabaseConnection,
    organization_id: &str,
) -> Result<Vec<strike_funds::Model>, EngineError> {
    let funds = StrikeFunds::find()
        .filter(strike_funds::Column::OrganizationId.eq(organization_id))
        .filter(strike_funds::Column::Status.eq(strike_funds::FundStatus::Active))
        .all(db)
        .await?;
    Ok(funds)
}
