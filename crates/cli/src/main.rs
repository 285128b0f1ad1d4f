use anyhow::Result;
use clap::Parser;

use quant_pilot_cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    quant_pilot_cli::app_init().await?;
    quant_pilot_cli::run(cli).await
}
