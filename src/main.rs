use anyhow::Result;
use clap::Parser;

use uxlab_cli::cli::{self, Cli};

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    cli::execute(cli)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
