use serde::{Deserialize, Serialize};
use time::Date;

use super::CostType;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Date range the portal groups its cost-type catalog by.
///
/// Ordered by start, then end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillingPeriod {
    #[serde(with = "iso_date")]
    pub start: Date,
    #[serde(with = "iso_date")]
    pub end: Date,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodCostTypes {
    #[serde(flatten)]
    pub period: BillingPeriod,
    pub cost_types: Vec<CostType>,
}

/// Catalog of supported cost types per billing period, in portal order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupportedCostTypes(pub Vec<PeriodCostTypes>);

impl SupportedCostTypes {
    /// The most recent billing period.
    ///
    /// Picked by date rather than by position, so an unordered catalog still
    /// resolves correctly. Among equal periods the last one listed wins.
    pub fn latest(&self) -> Option<&PeriodCostTypes> {
        self.0.iter().max_by_key(|entry| entry.period)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
