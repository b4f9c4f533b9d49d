use std::sync::Arc;

use anyhow::Result;
use metering_service::{
    config::AppConfig,
    metrics_server,
    observability,
    pipeline::Coordinator,
    sinks::{http_api, MqttPublisher},
    sources::ExportFilePortal,
};
use portal_client::MeterPortal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr).await?;
    }

    let portal: Arc<dyn MeterPortal> = Arc::new(ExportFilePortal::new(&cfg.portal.export_path));
    let coordinator = Arc::new(Coordinator::new(portal, cfg.poll.interval(), cfg.poll.timeout()));

    http_api::serve(&cfg.api.bind_addr, coordinator.subscribe()).await?;

    let cancel = CancellationToken::new();

    let publisher = cfg.mqtt.as_ref().map(|mqtt_cfg| {
        let (publisher, event_loop) = MqttPublisher::connect(mqtt_cfg);
        tracing::info!(
            host = %mqtt_cfg.host,
            port = mqtt_cfg.port,
            base_topic = %mqtt_cfg.base_topic,
            "publishing meter values to MQTT"
        );
        tokio::spawn(publisher.run(event_loop, coordinator.subscribe(), cancel.clone()))
    });

    let poller = {
        let coordinator = Arc::clone(&coordinator);
        let cancel = cancel.clone();
        tokio::spawn(async move { coordinator.run(cancel).await })
    };
    tracing::info!(
        interval_secs = cfg.poll.interval().as_secs(),
        export_path = %cfg.portal.export_path,
        "polling portal export"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    cancel.cancel();
    poller.await?;
    if let Some(publisher) = publisher {
        publisher.await?;
    }

    Ok(())
}
