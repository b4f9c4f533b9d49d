use std::fmt;

use serde::{Deserialize, Serialize};

/// Portal-assigned identifier of one physical meter / billing line, e.g. `HZ01`.
///
/// The first two characters carry the category prefix:
/// - `HZ`: heating
/// - `WW`: hot water
/// - `KW`: cold water
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostType(String);

/// Category derived from the identifier prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    Heating,
    HotWater,
    ColdWater,
    Unknown,
}

impl CostType {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Two-letter prefix, or the whole identifier when it is shorter.
    pub fn prefix(&self) -> &str {
        self.0.get(..2).unwrap_or(&self.0)
    }

    pub fn category(&self) -> CostCategory {
        match self.prefix() {
            "HZ" => CostCategory::Heating,
            "WW" => CostCategory::HotWater,
            "KW" => CostCategory::ColdWater,
            _ => CostCategory::Unknown,
        }
    }

    pub fn is_cold_water(&self) -> bool {
        self.category() == CostCategory::ColdWater
    }
}

impl fmt::Display for CostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CostType {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CostType {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl CostCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heating => "heating",
            Self::HotWater => "hot_water",
            Self::ColdWater => "cold_water",
            Self::Unknown => "unknown",
        }
    }
}
