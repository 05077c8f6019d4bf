//! Sluice CLI: transform stdin lines through an operator chain.

use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use sluice::{CliArgs, run};
use sluice_core::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    let config = match args.load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Starting sluice chain '{}' ({:?}, {} workers)",
        config.chain.name, config.transform.kind, config.transform.workers
    );

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Chain failed: {e}");
            ExitCode::FAILURE
        }
    }
}
