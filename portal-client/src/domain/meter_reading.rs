use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::CostType;

/// Semantic category of a reading series.
///
/// `ColdWater` exists for completeness; cold-water series are handled
/// structurally and never classified into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingKind {
    Heating,
    HotWater,
    ColdWater,
}

impl ReadingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heating => "heating",
            Self::HotWater => "hot_water",
            Self::ColdWater => "cold_water",
        }
    }
}

/// A running-total observation derived from monthly deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterReading {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub value: f64,
    pub unit: String,
    pub cost_type: CostType,
    pub kind: ReadingKind,
}
