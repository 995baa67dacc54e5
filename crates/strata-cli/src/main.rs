//! The `strata` binary.

use clap::Parser;
use strata_cli::{CliArgs, StrataCli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let cli = StrataCli::from_args(&args)?;
    cli.run(args).await
}
