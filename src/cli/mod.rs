pub mod events;
pub mod export;
pub mod reset;
pub mod run;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use uxlab_core_types::Variant;

#[derive(Parser)]
#[command(
    name = "uxlab",
    version,
    about = "Browser-local HCI study harness with interaction telemetry"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the scripted login → submit → feedback participant flow
    Run(run::RunArgs),
    /// Export the collected telemetry as a CSV report
    Export(export::ExportArgs),
    /// Show the tail of the collected telemetry log
    Events(events::EventsArgs),
    /// Clear all persisted study data
    Reset(reset::ResetArgs),
}

#[derive(Args, Clone)]
pub struct StoreArgs {
    /// Directory holding the persisted study state
    #[arg(long, default_value = ".uxlab")]
    pub data_dir: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum VariantArg {
    Bootstrap,
    Bulma,
}

impl From<VariantArg> for Variant {
    fn from(value: VariantArg) -> Self {
        match value {
            VariantArg::Bootstrap => Variant::Bootstrap,
            VariantArg::Bulma => Variant::Bulma,
        }
    }
}

pub fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => run::execute(args),
        Command::Export(args) => export::execute(args),
        Command::Events(args) => events::execute(args),
        Command::Reset(args) => reset::execute(args),
    }
}
