use std::{sync::Arc, time::Duration};

use portal_client::MeterPortal;
use tokio::{sync::watch, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{assemble, Snapshot, UpdateFailed};

/// Latest good snapshot, `None` until the first refresh succeeds.
pub type SnapshotReceiver = watch::Receiver<Option<Arc<Snapshot>>>;

/// Refreshes the snapshot on a fixed interval and publishes it.
///
/// A failed refresh leaves the previously published snapshot in place.
pub struct Coordinator {
    portal: Arc<dyn MeterPortal>,
    interval: Duration,
    timeout: Duration,
    tx: watch::Sender<Option<Arc<Snapshot>>>,
}

impl Coordinator {
    pub fn new(portal: Arc<dyn MeterPortal>, interval: Duration, timeout: Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            portal,
            interval,
            timeout,
            tx,
        }
    }

    pub fn subscribe(&self) -> SnapshotReceiver {
        self.tx.subscribe()
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.tx.borrow().clone()
    }

    /// Run one polling cycle, bounded by the configured timeout.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, UpdateFailed> {
        let started = std::time::Instant::now();
        metrics::counter!("portal_refresh_total").increment(1);

        let result = match tokio::time::timeout(self.timeout, assemble(self.portal.as_ref())).await {
            Ok(res) => res,
            Err(_elapsed) => Err(UpdateFailed::Timeout(self.timeout)),
        };
        metrics::histogram!("portal_refresh_duration_seconds").record(started.elapsed().as_secs_f64());

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                metrics::gauge!("snapshot_cost_types").set(snapshot.cost_types().len() as f64);
                tracing::info!(
                    cost_types = snapshot.cost_types().len(),
                    cumulative_series = snapshot.cumulative_histories.len(),
                    cold_water_meters = snapshot.cold_water.len(),
                    "portal data refreshed"
                );
                self.tx.send_replace(Some(Arc::clone(&snapshot)));
                Ok(snapshot)
            }
            Err(e) => {
                metrics::counter!("portal_refresh_failures_total").increment(1);
                tracing::error!(error = %e, "portal refresh failed, keeping last snapshot");
                Err(e)
            }
        }
    }

    /// Refresh immediately, then on every interval tick until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.refresh() => {}
                    }
                }
            }
        }

        tracing::info!("poll coordinator stopped");
    }
}
