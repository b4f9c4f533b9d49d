use anyhow::{bail, Result};
use metering_service::{observability, pipeline::assemble, sinks::sensors, sources::ExportFilePortal};
use std::env;

/// Run a single polling cycle against an export file and print the result as JSON.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    let (path, as_sensors) = match args.as_slice() {
        [_, path] => (path, false),
        [_, flag, path] if flag == "--sensors" => (path, true),
        _ => bail!("usage: snapshot_once [--sensors] <export_json_path>"),
    };

    let portal = ExportFilePortal::new(path);
    let snapshot = assemble(&portal).await?;

    let json = if as_sensors {
        serde_json::to_string_pretty(&sensors::states(&snapshot))?
    } else {
        serde_json::to_string_pretty(&snapshot)?
    };
    println!("{json}");

    Ok(())
}
