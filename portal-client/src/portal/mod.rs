use std::collections::BTreeMap;

use crate::domain::{CostType, Reading, ReadingKind, SupportedCostTypes};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PortalError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("malformed portal response: {0}")]
    Decode(String),
    #[error("portal unavailable: {0}")]
    Unavailable(String),
}

/// Already-authenticated access to the metering portal.
///
/// Implementations own session handling; callers only see the cycle hook and the
/// four reads the snapshot is built from.
#[async_trait::async_trait]
pub trait MeterPortal: Send + Sync {
    /// Called once before the reads of a polling cycle.
    ///
    /// Implementations pin upstream state here so the reads that follow agree.
    async fn begin_cycle(&self) -> Result<(), PortalError> {
        Ok(())
    }

    /// Current absolute reading per cost type.
    async fn meter_readings(&self) -> Result<BTreeMap<CostType, Reading>, PortalError>;

    /// Monthly delta series of every cost type belonging to `kind`.
    ///
    /// `in_kwh` asks for energy-normalized values where the portal supports it.
    async fn monthly_consumptions(
        &self,
        kind: ReadingKind,
        in_kwh: bool,
    ) -> Result<BTreeMap<CostType, Vec<Reading>>, PortalError>;

    /// Known cost types grouped by billing period.
    async fn supported_cost_types(&self) -> Result<SupportedCostTypes, PortalError>;

    /// Monthly delta series of exactly one cost type.
    async fn monthly_consumption(&self, cost_type: &CostType) -> Result<Vec<Reading>, PortalError>;
}
