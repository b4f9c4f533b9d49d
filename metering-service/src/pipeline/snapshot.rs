use std::collections::{BTreeMap, BTreeSet};

use portal_client::domain::{CostType, MeterReading, Reading};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Everything one polling cycle learned from the portal.
///
/// Built once by [`super::assemble`] and replaced wholesale on the next refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Latest absolute reading per cost type.
    pub meter_readings: BTreeMap<CostType, Reading>,
    /// Monthly deltas per cost type, oldest first.
    pub monthly: BTreeMap<CostType, Vec<Reading>>,
    pub cumulative_histories: BTreeMap<CostType, Vec<MeterReading>>,
    /// Final value of each cumulative history.
    pub cumulative_totals: BTreeMap<CostType, f64>,
    /// Most recent monthly reading per cold-water meter.
    pub cold_water: BTreeMap<CostType, Reading>,
    #[serde(with = "time::serde::rfc3339")]
    pub refreshed_at: OffsetDateTime,
}

impl Snapshot {
    pub fn empty(refreshed_at: OffsetDateTime) -> Self {
        Self {
            meter_readings: BTreeMap::new(),
            monthly: BTreeMap::new(),
            cumulative_histories: BTreeMap::new(),
            cumulative_totals: BTreeMap::new(),
            cold_water: BTreeMap::new(),
            refreshed_at,
        }
    }

    /// Sorted union of the cost types sensors can be built for.
    pub fn cost_types(&self) -> BTreeSet<&CostType> {
        self.meter_readings
            .keys()
            .chain(self.monthly.keys())
            .chain(self.cold_water.keys())
            .collect()
    }
}
