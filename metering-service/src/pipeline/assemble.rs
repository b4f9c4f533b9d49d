use std::collections::BTreeMap;

use futures::future::join_all;
use portal_client::{
    domain::{CostType, Reading, ReadingKind, SupportedCostTypes},
    MeterPortal,
};
use time::OffsetDateTime;

use super::{Snapshot, UpdateFailed};
use crate::transform::build_history;

/// Run one polling cycle against `portal`.
///
/// The portal is told a cycle begins, then the four primary reads are issued
/// together and any of them failing fails the cycle. Cold-water reads are
/// isolated per meter. Nothing is assembled until every read has settled.
#[tracing::instrument(skip_all)]
pub async fn assemble<P>(portal: &P) -> Result<Snapshot, UpdateFailed>
where
    P: MeterPortal + ?Sized,
{
    portal.begin_cycle().await?;

    let (meter_readings, heating, hot_water, supported) = tokio::try_join!(
        portal.meter_readings(),
        portal.monthly_consumptions(ReadingKind::Heating, true),
        portal.monthly_consumptions(ReadingKind::HotWater, true),
        portal.supported_cost_types(),
    )?;

    let monthly = merge_monthly(heating, hot_water);
    let cold_water = fetch_cold_water(portal, &supported).await;

    let mut cumulative_histories = BTreeMap::new();
    let mut cumulative_totals = BTreeMap::new();
    for (cost_type, series) in &monthly {
        if series.is_empty() {
            continue;
        }
        let history = build_history(cost_type, series);
        let Some(last) = history.last() else {
            continue;
        };
        if history.windows(2).any(|w| w[1].value < w[0].value) {
            tracing::warn!(cost_type = %cost_type, "cumulative history decreases, monthly deltas contain negative values");
        }
        cumulative_totals.insert(cost_type.clone(), last.value);
        cumulative_histories.insert(cost_type.clone(), history);
    }

    tracing::debug!(
        meters = meter_readings.len(),
        monthly_series = monthly.len(),
        cold_water_meters = cold_water.len(),
        "portal snapshot assembled"
    );

    Ok(Snapshot {
        meter_readings,
        monthly,
        cumulative_histories,
        cumulative_totals,
        cold_water,
        refreshed_at: OffsetDateTime::now_utc(),
    })
}

/// Merge heating and hot-water monthly series into one map.
///
/// On a shared key the hot-water series wins. Every series is sorted by
/// timestamp (stable) so its last entry is the latest month.
pub fn merge_monthly(
    heating: BTreeMap<CostType, Vec<Reading>>,
    hot_water: BTreeMap<CostType, Vec<Reading>>,
) -> BTreeMap<CostType, Vec<Reading>> {
    let mut merged = heating;
    merged.extend(hot_water);
    for series in merged.values_mut() {
        series.sort_by_key(|r| r.timestamp);
    }
    merged
}

/// Latest monthly reading of every cold-water meter in the newest billing period.
async fn fetch_cold_water<P>(portal: &P, supported: &SupportedCostTypes) -> BTreeMap<CostType, Reading>
where
    P: MeterPortal + ?Sized,
{
    let Some(latest) = supported.latest() else {
        return BTreeMap::new();
    };

    let meters: Vec<&CostType> = latest
        .cost_types
        .iter()
        .filter(|cost_type| cost_type.is_cold_water())
        .collect();
    let readings = join_all(meters.iter().map(|cost_type| fetch_isolated(portal, cost_type))).await;

    meters
        .into_iter()
        .zip(readings)
        .filter_map(|(cost_type, reading)| reading.map(|r| (cost_type.clone(), r)))
        .collect()
}

/// Fetch one meter's monthly series and keep its last entry.
///
/// Failures are recorded and turned into `None`; they never reach the caller.
pub async fn fetch_isolated<P>(portal: &P, cost_type: &CostType) -> Option<Reading>
where
    P: MeterPortal + ?Sized,
{
    match portal.monthly_consumption(cost_type).await {
        Ok(series) => series.into_iter().last(),
        Err(e) => {
            metrics::counter!("cold_water_fetch_failures_total").increment(1);
            tracing::debug!(cost_type = %cost_type, error = %e, "cold water fetch failed, skipping meter");
            None
        }
    }
}
