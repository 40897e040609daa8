use anyhow::{bail, Context, Result};
use clap::Args;

use kv_store::{FileStore, KvStore};

use super::StoreArgs;

const STUDY_KEYS: [&str; 6] = [
    "metrics_logs_v1",
    "study_identity_v1",
    "portal_db_v1",
    "last_submission_id",
    "eventlog",
    "pref-theme",
];

#[derive(Args)]
pub struct ResetArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Confirm clearing all study data on this machine
    #[arg(long)]
    pub yes: bool,
}

pub fn execute(args: ResetArgs) -> Result<()> {
    if !args.yes {
        bail!("this clears the participant's local study data; re-run with --yes to confirm");
    }
    let store = FileStore::open(&args.store.data_dir).context("opening the study store")?;
    for key in STUDY_KEYS {
        store.remove(key);
    }
    println!("study data cleared; the next run mints a new study id");
    Ok(())
}
