use portal_client::domain::{CostType, MeterReading, Reading, DEFAULT_UNIT};

use super::classify;

/// Turn one cost type's monthly deltas into a running-total series.
///
/// Rules:
/// - input is sorted by timestamp (stable, ties keep their given order).
/// - the series unit is the latest reading's unit, `kWh` when missing.
/// - each output value is the sum of all deltas up to and including that month,
///   rounded to 6 decimal places.
///
/// Deltas are not validated: a negative one (meter reset, correction) shows up
/// as a local decrease in the series.
pub fn build_history(cost_type: &CostType, monthly: &[Reading]) -> Vec<MeterReading> {
    if monthly.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<&Reading> = monthly.iter().collect();
    sorted.sort_by_key(|r| r.timestamp);

    let unit = sorted
        .last()
        .and_then(|r| r.unit())
        .unwrap_or(DEFAULT_UNIT)
        .to_string();
    let kind = classify(cost_type);

    let mut total = 0.0_f64;
    sorted
        .into_iter()
        .map(|reading| {
            total += reading.value;
            MeterReading {
                timestamp: reading.timestamp,
                value: round6(total),
                unit: unit.clone(),
                cost_type: cost_type.clone(),
                kind,
            }
        })
        .collect()
}

/// Round to 6 decimal places from the exact binary value, not a scaled copy.
fn round6(value: f64) -> f64 {
    format!("{value:.6}").parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_client::domain::ReadingKind;
    use time::{macros::datetime, OffsetDateTime};

    fn reading(ts: OffsetDateTime, value: f64, unit: Option<&str>) -> Reading {
        Reading {
            timestamp: ts,
            value,
            unit: unit.map(str::to_string),
            cost_type: CostType::from("HZ01"),
        }
    }

    #[test]
    fn empty_input_yields_empty_history() {
        assert!(build_history(&CostType::from("HZ01"), &[]).is_empty());
        assert!(build_history(&CostType::from("KW01"), &[]).is_empty());
    }

    #[test]
    fn accumulates_two_months() {
        let ct = CostType::from("HZ01");
        let monthly = vec![
            reading(datetime!(2024-01-31 00:00:00 UTC), 10.0, Some("kWh")),
            reading(datetime!(2024-02-29 00:00:00 UTC), 5.5, Some("kWh")),
        ];

        let history = build_history(&ct, &monthly);

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].timestamp, datetime!(2024-01-31 00:00:00 UTC));
        assert_eq!(history[0].value, 10.0);
        assert_eq!(history[0].kind, ReadingKind::Heating);
        assert_eq!(history[1].timestamp, datetime!(2024-02-29 00:00:00 UTC));
        assert_eq!(history[1].value, 15.5);
        assert_eq!(history[1].kind, ReadingKind::Heating);
        assert!(history.iter().all(|m| m.unit == "kWh" && m.cost_type == ct));
    }

    #[test]
    fn sorts_unordered_input() {
        let monthly = vec![
            reading(datetime!(2024-03-31 00:00:00 UTC), 3.0, None),
            reading(datetime!(2024-01-31 00:00:00 UTC), 1.0, None),
            reading(datetime!(2024-02-29 00:00:00 UTC), 2.0, None),
        ];

        let history = build_history(&CostType::from("WW01"), &monthly);

        let values: Vec<f64> = history.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![1.0, 3.0, 6.0]);
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(history.iter().all(|m| m.kind == ReadingKind::HotWater));
    }

    #[test]
    fn unit_comes_from_latest_reading() {
        let monthly = vec![
            reading(datetime!(2024-02-29 00:00:00 UTC), 2.0, Some("MWh")),
            reading(datetime!(2024-01-31 00:00:00 UTC), 1.0, Some("m³")),
        ];
        let history = build_history(&CostType::from("HZ01"), &monthly);
        assert!(history.iter().all(|m| m.unit == "MWh"));
    }

    #[test]
    fn missing_latest_unit_defaults_to_kwh() {
        let monthly = vec![
            reading(datetime!(2024-01-31 00:00:00 UTC), 1.0, Some("MWh")),
            reading(datetime!(2024-02-29 00:00:00 UTC), 2.0, Some("")),
        ];
        let history = build_history(&CostType::from("HZ01"), &monthly);
        assert!(history.iter().all(|m| m.unit == "kWh"));
    }

    #[test]
    fn equal_timestamps_keep_given_order() {
        let ts = datetime!(2024-01-31 00:00:00 UTC);
        let monthly = vec![reading(ts, 4.0, None), reading(ts, 1.0, None)];
        let history = build_history(&CostType::from("HZ01"), &monthly);
        assert_eq!(history[0].value, 4.0);
        assert_eq!(history[1].value, 5.0);
    }

    #[test]
    fn final_value_matches_sum_of_deltas() {
        let deltas = [0.1, 0.2, 0.3, 12.345678, 7.0, 0.000001, 99.9];
        let monthly: Vec<Reading> = deltas
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let ts = datetime!(2023-01-01 00:00:00 UTC) + time::Duration::days(31 * i as i64);
                reading(ts, *v, Some("kWh"))
            })
            .collect();

        let history = build_history(&CostType::from("HZ01"), &monthly);

        assert_eq!(history.len(), deltas.len());
        assert!(history.windows(2).all(|w| w[0].value <= w[1].value));
        let expected: f64 = deltas.iter().sum();
        assert!((history.last().unwrap().value - expected).abs() < 1e-6);
    }

    #[test]
    fn rounds_to_six_decimals() {
        let monthly = vec![
            reading(datetime!(2024-01-31 00:00:00 UTC), 0.1, None),
            reading(datetime!(2024-02-29 00:00:00 UTC), 0.2, None),
        ];
        let history = build_history(&CostType::from("HZ01"), &monthly);
        assert_eq!(history[1].value, 0.3);
    }

    #[test]
    fn rounds_seven_decimal_totals_from_exact_value() {
        // 861.4255485 is stored as 861.42554849999999..., below the midpoint.
        let history = build_history(
            &CostType::from("HZ01"),
            &[reading(datetime!(2024-01-31 00:00:00 UTC), 861.4255485, None)],
        );
        assert_eq!(history[0].value, 861.425548);

        let history = build_history(
            &CostType::from("HZ01"),
            &[reading(datetime!(2024-01-31 00:00:00 UTC), 0.0000005, None)],
        );
        assert_eq!(history[0].value, 0.0);

        let history = build_history(
            &CostType::from("HZ01"),
            &[reading(datetime!(2024-01-31 00:00:00 UTC), 2.0000005, None)],
        );
        assert_eq!(history[0].value, 2.000001);
    }

    #[test]
    fn negative_delta_passes_through() {
        let monthly = vec![
            reading(datetime!(2024-01-31 00:00:00 UTC), 10.0, None),
            reading(datetime!(2024-02-29 00:00:00 UTC), -4.0, None),
            reading(datetime!(2024-03-31 00:00:00 UTC), 1.0, None),
        ];
        let values: Vec<f64> = build_history(&CostType::from("HZ01"), &monthly)
            .iter()
            .map(|m| m.value)
            .collect();
        assert_eq!(values, vec![10.0, 6.0, 7.0]);
    }
}
