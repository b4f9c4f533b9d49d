mod cumulative;

pub use cumulative::build_history;

use portal_client::domain::{CostCategory, CostType, ReadingKind};

/// Map a cost type to the kind of reading it produces.
///
/// Rules:
/// - `HZ…` is heating.
/// - `WW…` is hot water.
/// - anything else falls back to heating.
///
/// The fallback is not a business rule. Identifiers with an unrecognized prefix
/// are reported so integrators notice them.
pub fn classify(cost_type: &CostType) -> ReadingKind {
    match cost_type.category() {
        CostCategory::Heating => ReadingKind::Heating,
        CostCategory::HotWater => ReadingKind::HotWater,
        CostCategory::ColdWater => ReadingKind::Heating,
        CostCategory::Unknown => {
            metrics::counter!("cost_type_unclassified_total").increment(1);
            tracing::debug!(cost_type = %cost_type, "unrecognized cost type prefix, classifying as heating");
            ReadingKind::Heating
        }
    }
}
