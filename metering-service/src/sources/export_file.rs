use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use portal_client::{
    domain::{CostType, Reading, ReadingKind, SupportedCostTypes},
    MeterPortal, PortalError,
};
use tokio::sync::RwLock;

use super::{InMemoryPortal, PortalExport};

/// Portal backed by a JSON export on disk.
///
/// The file is read once per polling cycle (in `begin_cycle`) and every read of
/// that cycle answers from the same document, so whatever fetches from the real
/// portal can replace it at any time. Reads before the first cycle load it
/// lazily. Expected shape:
/// - meter_readings: list of readings (timestamp RFC3339, value, unit?, cost_type)
/// - monthly: map of cost type to list of readings
/// - supported_cost_types: list of { start, end, cost_types }
pub struct ExportFilePortal {
    path: PathBuf,
    current: RwLock<Option<Arc<InMemoryPortal>>>,
}

impl ExportFilePortal {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(None),
        }
    }

    async fn load(&self) -> Result<Arc<InMemoryPortal>, PortalError> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            PortalError::Transport(format!("failed to read export file {}: {e}", self.path.display()))
        })?;
        let export: PortalExport = serde_json::from_str(&contents).map_err(|e| {
            metrics::counter!("export_file_parse_errors_total").increment(1);
            PortalError::Decode(format!("failed to parse export file {}: {e}", self.path.display()))
        })?;
        metrics::counter!("export_file_loads_total").increment(1);
        tracing::debug!(path = %self.path.display(), "export file loaded");
        Ok(Arc::new(InMemoryPortal::new(export)))
    }

    async fn current(&self) -> Result<Arc<InMemoryPortal>, PortalError> {
        if let Some(portal) = self.current.read().await.as_ref() {
            return Ok(Arc::clone(portal));
        }

        let mut current = self.current.write().await;
        if let Some(portal) = current.as_ref() {
            return Ok(Arc::clone(portal));
        }
        let portal = self.load().await?;
        *current = Some(Arc::clone(&portal));
        Ok(portal)
    }
}

#[async_trait::async_trait]
impl MeterPortal for ExportFilePortal {
    async fn begin_cycle(&self) -> Result<(), PortalError> {
        let portal = self.load().await?;
        *self.current.write().await = Some(portal);
        Ok(())
    }

    async fn meter_readings(&self) -> Result<BTreeMap<CostType, Reading>, PortalError> {
        self.current().await?.meter_readings().await
    }

    async fn monthly_consumptions(
        &self,
        kind: ReadingKind,
        in_kwh: bool,
    ) -> Result<BTreeMap<CostType, Vec<Reading>>, PortalError> {
        self.current().await?.monthly_consumptions(kind, in_kwh).await
    }

    async fn supported_cost_types(&self) -> Result<SupportedCostTypes, PortalError> {
        self.current().await?.supported_cost_types().await
    }

    async fn monthly_consumption(&self, cost_type: &CostType) -> Result<Vec<Reading>, PortalError> {
        self.current().await?.monthly_consumption(cost_type).await
    }
}
