use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::CostType;

/// Unit assumed when the portal omits one.
pub const DEFAULT_UNIT: &str = "kWh";

/// A single value observed by the portal for one cost type.
///
/// Depending on the call this is either an absolute meter value or a monthly delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub cost_type: CostType,
}

impl Reading {
    /// Reported unit, or `None` when missing or blank.
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref().filter(|u| !u.trim().is_empty())
    }

    pub fn unit_or_default(&self) -> &str {
        self.unit().unwrap_or(DEFAULT_UNIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn reading(unit: Option<&str>) -> Reading {
        Reading {
            timestamp: datetime!(2024-01-31 00:00:00 UTC),
            value: 1.5,
            unit: unit.map(str::to_string),
            cost_type: CostType::from("HZ01"),
        }
    }

    #[test]
    fn blank_unit_falls_back_to_kwh() {
        assert_eq!(reading(None).unit_or_default(), "kWh");
        assert_eq!(reading(Some("")).unit_or_default(), "kWh");
        assert_eq!(reading(Some("  ")).unit_or_default(), "kWh");
        assert_eq!(reading(Some("m³")).unit_or_default(), "m³");
    }

    #[test]
    fn deserializes_rfc3339_without_unit() {
        let json = r#"{"timestamp":"2024-02-29T00:00:00+01:00","value":3.25,"cost_type":"WW01"}"#;
        let parsed: Reading = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.timestamp, datetime!(2024-02-28 23:00:00 UTC));
        assert_eq!(parsed.value, 3.25);
        assert!(parsed.unit.is_none());
        assert_eq!(parsed.cost_type.as_str(), "WW01");
    }
}
