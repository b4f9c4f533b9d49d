use std::collections::{BTreeMap, HashSet};

use portal_client::{
    domain::{CostCategory, CostType, Reading, ReadingKind, SupportedCostTypes},
    MeterPortal, PortalError,
};
use serde::{Deserialize, Serialize};

/// Raw portal data as one document.
///
/// This is the shape of the export file and the backing store of
/// [`InMemoryPortal`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortalExport {
    #[serde(default)]
    pub meter_readings: Vec<Reading>,
    /// Monthly deltas of every cost type, cold water included.
    #[serde(default)]
    pub monthly: BTreeMap<CostType, Vec<Reading>>,
    #[serde(default)]
    pub supported_cost_types: SupportedCostTypes,
}

/// Portal operation to fail on purpose.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailOn {
    MeterReadings,
    MonthlyConsumptions(ReadingKind),
    SupportedCostTypes,
    MonthlyConsumption(CostType),
}

/// Portal answering from memory.
///
/// Values are returned as stored, so `in_kwh` has no effect. Bulk monthly
/// reads never include cold-water series, as on the real portal.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPortal {
    export: PortalExport,
    failures: HashSet<FailOn>,
}

impl InMemoryPortal {
    pub fn new(export: PortalExport) -> Self {
        Self {
            export,
            failures: HashSet::new(),
        }
    }

    pub fn failing(mut self, failure: FailOn) -> Self {
        self.failures.insert(failure);
        self
    }

    fn check(&self, op: FailOn) -> Result<(), PortalError> {
        if self.failures.contains(&op) {
            return Err(PortalError::Unavailable(format!("injected failure on {op:?}")));
        }
        Ok(())
    }
}

/// Bulk read a cost type is listed under. Cold water has none; unknown
/// prefixes are grouped with heating.
fn bulk_kind(cost_type: &CostType) -> Option<ReadingKind> {
    match cost_type.category() {
        CostCategory::Heating | CostCategory::Unknown => Some(ReadingKind::Heating),
        CostCategory::HotWater => Some(ReadingKind::HotWater),
        CostCategory::ColdWater => None,
    }
}

#[async_trait::async_trait]
impl MeterPortal for InMemoryPortal {
    async fn meter_readings(&self) -> Result<BTreeMap<CostType, Reading>, PortalError> {
        self.check(FailOn::MeterReadings)?;
        Ok(self
            .export
            .meter_readings
            .iter()
            .map(|r| (r.cost_type.clone(), r.clone()))
            .collect())
    }

    async fn monthly_consumptions(
        &self,
        kind: ReadingKind,
        _in_kwh: bool,
    ) -> Result<BTreeMap<CostType, Vec<Reading>>, PortalError> {
        self.check(FailOn::MonthlyConsumptions(kind))?;
        Ok(self
            .export
            .monthly
            .iter()
            .filter(|(cost_type, _)| bulk_kind(cost_type) == Some(kind))
            .map(|(cost_type, series)| (cost_type.clone(), series.clone()))
            .collect())
    }

    async fn supported_cost_types(&self) -> Result<SupportedCostTypes, PortalError> {
        self.check(FailOn::SupportedCostTypes)?;
        Ok(self.export.supported_cost_types.clone())
    }

    async fn monthly_consumption(&self, cost_type: &CostType) -> Result<Vec<Reading>, PortalError> {
        self.check(FailOn::MonthlyConsumption(cost_type.clone()))?;
        Ok(self.export.monthly.get(cost_type).cloned().unwrap_or_default())
    }
}
