pub mod export_file;
pub mod memory;

pub use export_file::ExportFilePortal;
pub use memory::{FailOn, InMemoryPortal, PortalExport};
