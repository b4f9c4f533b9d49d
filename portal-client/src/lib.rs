pub mod domain;
pub mod portal;

pub use portal::{MeterPortal, PortalError};
