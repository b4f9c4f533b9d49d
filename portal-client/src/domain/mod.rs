mod billing_period;
mod cost_type;
mod meter_reading;
mod reading;

pub use billing_period::{BillingPeriod, PeriodCostTypes, SupportedCostTypes};
pub use cost_type::{CostCategory, CostType};
pub use meter_reading::{MeterReading, ReadingKind};
pub use reading::{Reading, DEFAULT_UNIT};
