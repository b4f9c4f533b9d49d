use portal_client::domain::{CostCategory, CostType, DEFAULT_UNIT};
use serde::Serialize;
use time::{OffsetDateTime, Time, UtcOffset};

use crate::pipeline::Snapshot;

/// Trailing entries exposed as the `history` attribute.
pub const HISTORY_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    /// Absolute meter value.
    Meter,
    /// Latest monthly delta.
    Monthly,
    /// Running total of the monthly deltas.
    Cumulative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Energy,
    Water,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Total,
    TotalIncreasing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorDefinition {
    pub key: String,
    pub name: String,
    pub sensor_type: SensorType,
    pub cost_type: CostType,
    pub device_class: Option<DeviceClass>,
    pub state_class: StateClass,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub value: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorAttributes {
    pub cost_type: CostType,
    pub sensor_type: SensorType,
    #[serde(with = "time::serde::rfc3339::option", skip_serializing_if = "Option::is_none")]
    pub last_reading: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryEntry>>,
}

/// What the home-automation side displays for one sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    #[serde(flatten)]
    pub definition: SensorDefinition,
    pub value: Option<f64>,
    pub unit: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_reset: Option<OffsetDateTime>,
    pub attributes: SensorAttributes,
}

/// One point of whichever series backs a sensor.
struct Entry<'a> {
    timestamp: OffsetDateTime,
    value: f64,
    unit: Option<&'a str>,
}

fn label(cost_type: &CostType) -> &str {
    match cost_type.category() {
        CostCategory::Heating => "Heating",
        CostCategory::HotWater => "Hot water",
        CostCategory::ColdWater => "Cold water",
        CostCategory::Unknown => cost_type.as_str(),
    }
}

fn meter_device_class(cost_type: &CostType) -> Option<DeviceClass> {
    match cost_type.category() {
        CostCategory::Heating => Some(DeviceClass::Energy),
        CostCategory::HotWater | CostCategory::ColdWater => Some(DeviceClass::Water),
        CostCategory::Unknown => None,
    }
}

fn meter_unit(cost_type: &CostType) -> Option<&'static str> {
    match cost_type.category() {
        CostCategory::Heating => Some("kWh"),
        CostCategory::HotWater | CostCategory::ColdWater => Some("m³"),
        CostCategory::Unknown => None,
    }
}

fn definition(cost_type: &CostType, sensor_type: SensorType) -> SensorDefinition {
    let (prefix, suffix, device_class, state_class) = match sensor_type {
        SensorType::Meter => (
            "meter",
            "meter reading",
            meter_device_class(cost_type),
            StateClass::TotalIncreasing,
        ),
        SensorType::Monthly => (
            "monthly",
            "monthly consumption",
            Some(DeviceClass::Energy),
            StateClass::Total,
        ),
        SensorType::Cumulative => (
            "cumulative",
            "cumulative consumption",
            Some(DeviceClass::Energy),
            StateClass::TotalIncreasing,
        ),
    };

    SensorDefinition {
        key: format!("{prefix}_{}", cost_type.as_str().to_lowercase()),
        name: format!("{} {cost_type} {suffix}", label(cost_type)),
        sensor_type,
        cost_type: cost_type.clone(),
        device_class,
        state_class,
    }
}

/// Sensors a snapshot supports, ordered by cost type.
pub fn discover(snapshot: &Snapshot) -> Vec<SensorDefinition> {
    let mut sensors = Vec::new();
    for cost_type in snapshot.cost_types() {
        if snapshot.meter_readings.contains_key(cost_type) || snapshot.cold_water.contains_key(cost_type) {
            sensors.push(definition(cost_type, SensorType::Meter));
        }
        if snapshot.monthly.get(cost_type).is_some_and(|s| !s.is_empty()) {
            sensors.push(definition(cost_type, SensorType::Monthly));
        }
        if snapshot.cumulative_histories.get(cost_type).is_some_and(|h| !h.is_empty()) {
            sensors.push(definition(cost_type, SensorType::Cumulative));
        }
    }
    sensors
}

fn entries<'a>(snapshot: &'a Snapshot, def: &SensorDefinition) -> Vec<Entry<'a>> {
    let cost_type = &def.cost_type;
    match def.sensor_type {
        SensorType::Meter => snapshot
            .meter_readings
            .get(cost_type)
            .or_else(|| snapshot.cold_water.get(cost_type))
            .map(|r| Entry {
                timestamp: r.timestamp,
                value: r.value,
                unit: r.unit(),
            })
            .into_iter()
            .collect(),
        SensorType::Monthly => snapshot
            .monthly
            .get(cost_type)
            .map(|series| {
                series
                    .iter()
                    .map(|r| Entry {
                        timestamp: r.timestamp,
                        value: r.value,
                        unit: r.unit(),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        SensorType::Cumulative => snapshot
            .cumulative_histories
            .get(cost_type)
            .map(|history| {
                history
                    .iter()
                    .map(|m| Entry {
                        timestamp: m.timestamp,
                        value: m.value,
                        unit: Some(m.unit.as_str()),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// First instant of the month `ts` falls in, in UTC.
fn start_of_month(ts: OffsetDateTime) -> Option<OffsetDateTime> {
    let utc = ts.to_offset(UtcOffset::UTC);
    Some(utc.replace_day(1).ok()?.replace_time(Time::MIDNIGHT))
}

pub fn state(snapshot: &Snapshot, def: &SensorDefinition) -> SensorState {
    let entries = entries(snapshot, def);
    let latest = entries.last();

    let value = match def.sensor_type {
        SensorType::Meter | SensorType::Monthly => latest.map(|e| e.value),
        SensorType::Cumulative => snapshot.cumulative_totals.get(&def.cost_type).copied(),
    };

    let unit = match def.sensor_type {
        SensorType::Meter => meter_unit(&def.cost_type).map(str::to_string),
        SensorType::Monthly | SensorType::Cumulative => {
            Some(latest.and_then(|e| e.unit).unwrap_or(DEFAULT_UNIT).to_string())
        }
    };

    let last_reset = match def.sensor_type {
        SensorType::Monthly => latest.and_then(|e| start_of_month(e.timestamp)),
        SensorType::Meter | SensorType::Cumulative => None,
    };

    let history: Vec<HistoryEntry> = entries
        .iter()
        .skip(entries.len().saturating_sub(HISTORY_LEN))
        .map(|e| HistoryEntry {
            value: e.value,
            timestamp: e.timestamp,
            unit: e.unit.map(str::to_string),
        })
        .collect();

    SensorState {
        definition: def.clone(),
        value,
        unit,
        last_reset,
        attributes: SensorAttributes {
            cost_type: def.cost_type.clone(),
            sensor_type: def.sensor_type,
            last_reading: latest.map(|e| e.timestamp),
            history: (history.len() > 1).then_some(history),
        },
    }
}

pub fn states(snapshot: &Snapshot) -> Vec<SensorState> {
    discover(snapshot).iter().map(|def| state(snapshot, def)).collect()
}
