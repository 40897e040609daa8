use anyhow::{Context, Result};
use clap::Args;

use kv_store::FileStore;
use telemetry::PersistPolicy;

use crate::scenario::{self, StudyOptions};

use super::{StoreArgs, VariantArg};

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// UI variant the simulated pages are rendered with
    #[arg(long, value_enum, default_value_t = VariantArg::Bootstrap)]
    pub variant: VariantArg,

    /// Coalesce persistence on a timer instead of writing every event
    #[arg(long, value_name = "MS")]
    pub debounce: Option<u64>,

    /// Start from the dark color scheme
    #[arg(long)]
    pub dark: bool,

    /// Optional participant nickname (never a real name)
    #[arg(long)]
    pub nickname: Option<String>,

    /// Name of the simulated upload
    #[arg(long, default_value = "solution.pdf")]
    pub file: String,

    /// Write the CSV report after the run
    #[arg(long)]
    pub export: bool,
}

pub fn execute(args: RunArgs) -> Result<()> {
    let store = FileStore::open(&args.store.data_dir).context("opening the study store")?;
    let opts = StudyOptions {
        variant: args.variant.into(),
        persist: match args.debounce {
            Some(delay_ms) => PersistPolicy::Debounced { delay_ms },
            None => PersistPolicy::Immediate,
        },
        prefers_dark: args.dark,
        nickname: args.nickname,
        file_name: args.file,
        export_dir: args.store.data_dir.clone(),
    };

    let summary = scenario::run_study(store, &opts)?;

    println!("participant      {}", summary.study_id);
    println!("sessions         {}", summary.sessions.len());
    println!("events recorded  {}", summary.events_recorded);
    println!(
        "submission       {} v{} ({}, {} bytes)",
        summary.submission.id,
        summary.submission.version,
        summary.submission.file_name,
        summary.submission.file_size
    );
    println!(
        "feedback         score {}: {}",
        summary.feedback.score, summary.feedback.comment
    );
    println!("journal entries  {}", summary.journal_entries);

    if args.export {
        super::export::execute(super::export::ExportArgs {
            store: args.store,
            out: None,
        })?;
    }
    Ok(())
}
