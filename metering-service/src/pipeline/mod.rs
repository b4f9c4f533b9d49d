mod assemble;
mod coordinator;
mod snapshot;

use std::time::Duration;

use portal_client::PortalError;

pub use assemble::{assemble, fetch_isolated, merge_monthly};
pub use coordinator::{Coordinator, SnapshotReceiver};
pub use snapshot::Snapshot;

/// A polling cycle that produced no snapshot.
#[derive(thiserror::Error, Debug)]
pub enum UpdateFailed {
    #[error("error fetching portal data: {0}")]
    Fetch(#[from] PortalError),
    #[error("refresh timed out after {0:?}")]
    Timeout(Duration),
}
