use anyhow::{Context, Result};
use clap::Args;

use kv_store::FileStore;
use telemetry::journal::EventJournal;

use super::StoreArgs;

#[derive(Args)]
pub struct EventsArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// How many of the newest events to show
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

pub fn execute(args: EventsArgs) -> Result<()> {
    let store = FileStore::open(&args.store.data_dir).context("opening the study store")?;
    let journal = EventJournal::new(store, "metrics_logs_v1");
    let events = journal.read();
    if events.is_empty() {
        println!("No metrics collected yet.");
        return Ok(());
    }

    let skip = events.len().saturating_sub(args.limit);
    for event in &events[skip..] {
        let label = event
            .name
            .as_deref()
            .or(event.code.as_deref())
            .unwrap_or("-");
        let duration = event
            .duration_ms
            .map(|ms| format!(" {ms}ms"))
            .unwrap_or_default();
        let outcome = match event.success {
            Some(true) => " ok",
            Some(false) => " failed",
            None => "",
        };
        println!(
            "{:<14} {:<10} {:<32}{}{}",
            event.timestamp,
            event.kind.as_str(),
            label,
            duration,
            outcome
        );
    }
    println!("({} of {} events)", events.len() - skip, events.len());
    Ok(())
}
