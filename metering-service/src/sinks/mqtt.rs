use std::{collections::HashMap, time::Duration};

use portal_client::domain::{CostCategory, CostType};
use rumqttc::v5::{mqttbytes::QoS, AsyncClient, EventLoop, MqttOptions};
use serde::Serialize;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use super::sensors::{self, SensorState, SensorType};
use crate::{
    config::MqttConfig,
    pipeline::{Snapshot, SnapshotReceiver},
};

/// One retained message to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: String,
}

#[derive(Debug, Serialize)]
struct MeterPayload<'a> {
    value: f64,
    unit: Option<&'a str>,
    #[serde(with = "time::serde::rfc3339::option")]
    date: Option<OffsetDateTime>,
}

/// Topic node of one meter.
///
/// The only meter of a category is published under the category name
/// (`heating`, `hot_water`, `cold_water`); several meters of one category are
/// told apart by their lowercased id. Unknown categories use the id alone.
fn node(cost_type: &CostType, meters_per_category: &HashMap<CostCategory, usize>) -> String {
    let category = cost_type.category();
    let id = cost_type.as_str().to_lowercase();
    match category {
        CostCategory::Unknown => id,
        _ if meters_per_category.get(&category).copied().unwrap_or(0) > 1 => {
            format!("{}_{id}", category.as_str())
        }
        _ => category.as_str().to_string(),
    }
}

/// Retained messages for the meter sensors of `snapshot`.
///
/// Per meter:
/// - `{base}/{node}/state`: JSON `{ value, unit, date }`
/// - `{base}/{node}/value`: the bare value
///
/// Meters without a value are skipped.
pub fn messages(base_topic: &str, snapshot: &Snapshot) -> Result<Vec<MqttMessage>, serde_json::Error> {
    let meters: Vec<SensorState> = sensors::states(snapshot)
        .into_iter()
        .filter(|s| s.definition.sensor_type == SensorType::Meter)
        .collect();

    let mut meters_per_category: HashMap<CostCategory, usize> = HashMap::new();
    for meter in &meters {
        *meters_per_category
            .entry(meter.definition.cost_type.category())
            .or_default() += 1;
    }

    let base = base_topic.trim_end_matches('/');
    let mut out = Vec::with_capacity(meters.len() * 2);
    for meter in &meters {
        let Some(value) = meter.value else {
            continue;
        };
        let topic = format!("{base}/{}", node(&meter.definition.cost_type, &meters_per_category));
        let payload = MeterPayload {
            value,
            unit: meter.unit.as_deref(),
            date: meter.attributes.last_reading,
        };

        out.push(MqttMessage {
            topic: format!("{topic}/state"),
            payload: serde_json::to_string(&payload)?,
        });
        out.push(MqttMessage {
            topic: format!("{topic}/value"),
            payload: value.to_string(),
        });
    }
    Ok(out)
}

/// Publishes meter values of every new snapshot as retained MQTT messages.
pub struct MqttPublisher {
    client: AsyncClient,
    base_topic: String,
}

impl MqttPublisher {
    /// Create the client. Nothing is sent until the returned event loop is driven.
    pub fn connect(cfg: &MqttConfig) -> (Self, EventLoop) {
        let mut options = MqttOptions::new(&cfg.client_id, &cfg.host, cfg.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) = (&cfg.username, &cfg.password) {
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, 10);
        let publisher = Self {
            client,
            base_topic: cfg.base_topic.clone(),
        };
        (publisher, event_loop)
    }

    pub async fn publish_snapshot(&self, snapshot: &Snapshot) -> anyhow::Result<usize> {
        let messages = messages(&self.base_topic, snapshot)?;
        let count = messages.len();

        for msg in messages {
            tracing::debug!(topic = %msg.topic, payload = %msg.payload, "publishing retained MQTT message");
            self.client
                .publish(msg.topic.clone(), QoS::AtLeastOnce, true, msg.payload)
                .await
                .map_err(|e| {
                    metrics::counter!("mqtt_publish_failures_total").increment(1);
                    anyhow::anyhow!("failed to publish MQTT message to {}: {e}", msg.topic)
                })?;
            metrics::counter!("mqtt_messages_published_total").increment(1);
        }

        Ok(count)
    }

    /// Publish the current snapshot, then every newly published one, until cancelled.
    pub async fn run(self, event_loop: EventLoop, mut snapshots: SnapshotReceiver, cancel: CancellationToken) {
        let connection = tokio::spawn(drive(event_loop, cancel.clone()));

        let initial = snapshots.borrow_and_update().clone();
        if let Some(snapshot) = initial {
            self.publish_logged(&snapshot).await;
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let latest = snapshots.borrow_and_update().clone();
                    if let Some(snapshot) = latest {
                        self.publish_logged(&snapshot).await;
                    }
                }
            }
        }

        if let Err(e) = self.client.try_disconnect() {
            tracing::debug!(error = %e, "MQTT disconnect failed");
        }
        connection.abort();
        tracing::info!("MQTT publisher stopped");
    }

    async fn publish_logged(&self, snapshot: &Snapshot) {
        match self.publish_snapshot(snapshot).await {
            Ok(count) => tracing::info!(messages = count, "meter values published to MQTT"),
            Err(e) => tracing::error!(error = %e, "MQTT publish failed"),
        }
    }
}

/// Poll the connection; the client only makes progress while this runs.
async fn drive(mut event_loop: EventLoop, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = event_loop.poll() => {
                if let Err(e) = event {
                    tracing::error!(error = %e, "MQTT connection error");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use portal_client::domain::Reading;
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    fn reading(id: &str, value: f64) -> Reading {
        Reading {
            timestamp: datetime!(2024-03-01 00:00:00 UTC),
            value,
            unit: None,
            cost_type: CostType::from(id),
        }
    }

    fn snapshot() -> Snapshot {
        let mut snapshot = Snapshot::empty(datetime!(2024-03-02 00:00:00 UTC));
        for (id, value) in [("HZ01", 1234.5), ("WW01", 56.0), ("XX01", 7.0)] {
            snapshot.meter_readings.insert(CostType::from(id), reading(id, value));
        }
        for (id, value) in [("KW01", 12.5), ("KW02", 3.0)] {
            snapshot.cold_water.insert(CostType::from(id), reading(id, value));
        }
        snapshot.monthly.insert(CostType::from("HZ01"), vec![reading("HZ01", 10.0)]);
        snapshot
    }

    fn topics(messages: &[MqttMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.topic.as_str()).collect()
    }

    #[test]
    fn publishes_state_and_value_per_meter() {
        let messages = messages("brunata/v1", &snapshot()).unwrap();

        assert_eq!(
            topics(&messages),
            vec![
                "brunata/v1/heating/state",
                "brunata/v1/heating/value",
                "brunata/v1/cold_water_kw01/state",
                "brunata/v1/cold_water_kw01/value",
                "brunata/v1/cold_water_kw02/state",
                "brunata/v1/cold_water_kw02/value",
                "brunata/v1/hot_water/state",
                "brunata/v1/hot_water/value",
                "brunata/v1/xx01/state",
                "brunata/v1/xx01/value",
            ]
        );

        let state: serde_json::Value = serde_json::from_str(&messages[0].payload).unwrap();
        assert_eq!(
            state,
            json!({"value": 1234.5, "unit": "kWh", "date": "2024-03-01T00:00:00Z"})
        );
        assert_eq!(messages[1].payload, "1234.5");

        let cold: serde_json::Value = serde_json::from_str(&messages[2].payload).unwrap();
        assert_eq!(cold["unit"], "m³");
        assert_eq!(messages[3].payload, "12.5");

        let unknown: serde_json::Value = serde_json::from_str(&messages[8].payload).unwrap();
        assert_eq!(unknown["unit"], serde_json::Value::Null);
    }

    #[test]
    fn single_meter_of_a_category_uses_the_category_name() {
        let mut snapshot = Snapshot::empty(datetime!(2024-03-02 00:00:00 UTC));
        snapshot.cold_water.insert(CostType::from("KW01"), reading("KW01", 1.0));

        let messages = messages("brunata/v1/", &snapshot).unwrap();

        assert_eq!(
            topics(&messages),
            vec!["brunata/v1/cold_water/state", "brunata/v1/cold_water/value"]
        );
    }

    #[test]
    fn empty_snapshot_publishes_nothing() {
        let snapshot = Snapshot::empty(datetime!(2024-03-02 00:00:00 UTC));
        assert!(messages("brunata/v1", &snapshot).unwrap().is_empty());
    }
}
