use anyhow::{Context, Result};
use clap::Args;

use kv_store::FileStore;
use telemetry::export::{default_export_name, write_report};
use telemetry::journal::EventJournal;
use telemetry::ports::{ClockPort, SystemClock};
use uxlab_core_types::Variant;

use super::StoreArgs;

#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Report filename; defaults to metrics_<variant>_<date>.csv
    #[arg(long)]
    pub out: Option<String>,
}

pub fn execute(args: ExportArgs) -> Result<()> {
    let store = FileStore::open(&args.store.data_dir).context("opening the study store")?;
    let journal = EventJournal::new(store, "metrics_logs_v1");
    let events = journal.read();
    if events.is_empty() {
        println!("No metrics collected yet.");
        return Ok(());
    }

    let variant = events.last().map(|e| e.variant).unwrap_or(Variant::Unknown);
    let filename = args
        .out
        .unwrap_or_else(|| default_export_name(variant, SystemClock.now_ms()));
    let path = args.store.data_dir.join(filename);
    write_report(&path, &events).context("writing the CSV report")?;
    println!("exported {} events to {}", events.len(), path.display());
    Ok(())
}
