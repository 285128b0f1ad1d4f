//! # Quant Pilot CLI
//!
//! Entry point: environment loading, logging, command dispatch.

pub mod app;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::info;

use quant_pilot_core::{AppConfig, TradingDomain, TradingMode};

#[derive(Debug, Parser)]
#[command(name = "quant-pilot", version, about = "Automated paper/live trading engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// paper | live
    #[arg(long, global = true)]
    pub mode: Option<String>,

    /// crypto | equities
    #[arg(long, global = true)]
    pub domain: Option<String>,

    /// Comma separated, e.g. BTC/USDT,ETH/USDT
    #[arg(long, global = true, value_delimiter = ',')]
    pub instruments: Option<Vec<String>>,

    #[arg(long, global = true)]
    pub initial_balance: Option<f64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the engine and trade until SIGINT/SIGTERM
    Run,
    /// Print the resolved configuration as JSON
    Config,
}

impl Cli {
    /// Environment first, then flags on top
    pub fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::from_env().context("reading configuration")?;
        if let Some(mode) = &self.mode {
            config.mode = mode.parse::<TradingMode>()?;
        }
        if let Some(domain) = &self.domain {
            config.domain = domain.parse::<TradingDomain>()?;
        }
        if let Some(instruments) = &self.instruments {
            config.instruments = instruments
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(balance) = self.initial_balance {
            config.initial_balance = balance;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Loads `.env` and installs logging
pub async fn app_init() -> Result<()> {
    dotenv().ok();
    quant_pilot_core::logger::setup_logging().await?;
    info!("quant-pilot initialised");
    Ok(())
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.resolve_config()?;
    match cli.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Run => app::bootstrap::run_engine(config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_parse() {
        let cli = Cli::try_parse_from([
            "quant-pilot",
            "run",
            "--mode",
            "paper",
            "--instruments",
            "BTC/USDT,ETH/USDT",
            "--initial-balance",
            "2500",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Run));
        assert_eq!(cli.mode.as_deref(), Some("paper"));
        assert_eq!(
            cli.instruments,
            Some(vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()])
        );
        assert_eq!(cli.initial_balance, Some(2500.0));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["quant-pilot"]).is_err());
    }
}
