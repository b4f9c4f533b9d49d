use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::sensors::{self, SensorState};
use crate::pipeline::{Snapshot, SnapshotReceiver};

/// Read-only API over the latest published snapshot.
///
/// Routes:
/// - GET /snapshot
/// - GET /sensors
/// - GET /sensors/:key
pub fn router(snapshots: SnapshotReceiver) -> Router {
    Router::new()
        .route("/snapshot", get(get_snapshot))
        .route("/sensors", get(get_sensors))
        .route("/sensors/:key", get(get_sensor))
        .with_state(snapshots)
}

/// Bind `bind_addr` and serve the API on a background task.
pub async fn serve(bind_addr: &str, snapshots: SnapshotReceiver) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid api bind addr '{bind_addr}': {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let app = router(snapshots);

    tracing::info!(%addr, "sensor API listening");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            tracing::error!(error = %e, "sensor API server error");
        }
    });

    Ok(())
}

fn current(snapshots: &SnapshotReceiver) -> Result<Arc<Snapshot>, StatusCode> {
    snapshots.borrow().clone().ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

async fn get_snapshot(State(snapshots): State<SnapshotReceiver>) -> Result<Json<Snapshot>, StatusCode> {
    metrics::counter!("api_requests_total", "route" => "snapshot").increment(1);
    let snapshot = current(&snapshots)?;
    Ok(Json(snapshot.as_ref().clone()))
}

async fn get_sensors(State(snapshots): State<SnapshotReceiver>) -> Result<Json<Vec<SensorState>>, StatusCode> {
    metrics::counter!("api_requests_total", "route" => "sensors").increment(1);
    let snapshot = current(&snapshots)?;
    Ok(Json(sensors::states(&snapshot)))
}

async fn get_sensor(
    State(snapshots): State<SnapshotReceiver>,
    Path(key): Path<String>,
) -> Result<Json<SensorState>, StatusCode> {
    metrics::counter!("api_requests_total", "route" => "sensor").increment(1);
    let snapshot = current(&snapshots)?;
    sensors::discover(&snapshot)
        .iter()
        .find(|def| def.key == key)
        .map(|def| Json(sensors::state(&snapshot, def)))
        .ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use portal_client::domain::{CostType, Reading};
    use time::macros::datetime;
    use tokio::sync::watch;
    use tower::ServiceExt;

    use super::*;

    fn snapshot() -> Snapshot {
        let mut snapshot = Snapshot::empty(datetime!(2024-03-01 00:00:00 UTC));
        snapshot.cold_water.insert(
            CostType::from("KW01"),
            Reading {
                timestamp: datetime!(2024-02-29 00:00:00 UTC),
                value: 12.5,
                unit: Some("m³".to_string()),
                cost_type: CostType::from("KW01"),
            },
        );
        snapshot
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let res = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn unavailable_before_first_snapshot() {
        let (_tx, rx) = watch::channel(None);
        let (status, _) = get(router(rx), "/sensors").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn serves_sensor_states() {
        let (_tx, rx) = watch::channel(Some(Arc::new(snapshot())));

        let (status, json) = get(router(rx.clone()), "/sensors").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["key"], "meter_kw01");
        assert_eq!(json[0]["value"], 12.5);

        let (status, json) = get(router(rx.clone()), "/sensors/meter_kw01").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["unit"], "m³");

        let (status, _) = get(router(rx), "/sensors/meter_hz01").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn serves_snapshot() {
        let (_tx, rx) = watch::channel(Some(Arc::new(snapshot())));

        let (status, json) = get(router(rx), "/snapshot").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["cold_water"]["KW01"]["value"], 12.5);
        assert_eq!(json["refreshed_at"], "2024-03-01T00:00:00Z");
    }
}
