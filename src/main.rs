use clap::Parser;
use mockzure::cli::{run_cli, Cli};
use mockzure::telemetry::{init_logging, LogConfig};

fn main() -> anyhow::Result<()> {
    init_logging(&LogConfig::from_env())?;
    run_cli(Cli::parse())
}
