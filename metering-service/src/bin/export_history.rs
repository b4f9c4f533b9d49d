use anyhow::{bail, Result};
use metering_service::{observability, pipeline::assemble, sources::ExportFilePortal};
use std::{env, io};
use time::format_description::well_known::Rfc3339;

/// Write every cumulative history of one polling cycle to stdout as CSV.
///
/// Columns: cost_type, kind, timestamp (RFC3339), value, unit
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: export_history <export_json_path>");
    }
    let portal = ExportFilePortal::new(&args[1]);
    let snapshot = assemble(&portal).await?;

    let mut wtr = csv::Writer::from_writer(io::stdout().lock());
    wtr.write_record(["cost_type", "kind", "timestamp", "value", "unit"])?;
    let mut rows = 0usize;
    for history in snapshot.cumulative_histories.values() {
        for m in history {
            let timestamp = m.timestamp.format(&Rfc3339)?;
            let value = m.value.to_string();
            wtr.write_record([
                m.cost_type.as_str(),
                m.kind.as_str(),
                timestamp.as_str(),
                value.as_str(),
                m.unit.as_str(),
            ])?;
            rows += 1;
        }
    }
    wtr.flush()?;

    tracing::info!(rows, series = snapshot.cumulative_histories.len(), "cumulative histories exported");
    Ok(())
}
