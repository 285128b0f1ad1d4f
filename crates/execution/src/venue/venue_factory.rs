use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use quant_pilot_core::{AppConfig, AppError, AppResult, TradingMode, VenueSettings};
use quant_pilot_domain::{Instrument, MarketVenue};

use super::paper_venue::{PaperVenue, PaperVenueConfig};

type LiveBuilder = Box<dyn Fn(&VenueSettings) -> AppResult<Arc<dyn MarketVenue>> + Send + Sync>;

/// Picks the venue for the configured trading mode.
///
/// Paper mode always gets a [`PaperVenue`]. Live mode needs credentials and
/// an adapter registered under `VENUE_NAME`.
#[derive(Default)]
pub struct VenueFactory {
    live_adapters: HashMap<String, LiveBuilder>,
}

impl VenueFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_live_adapter<F>(&mut self, name: impl Into<String>, builder: F)
    where
        F: Fn(&VenueSettings) -> AppResult<Arc<dyn MarketVenue>> + Send + Sync + 'static,
    {
        self.live_adapters
            .insert(name.into().to_lowercase(), Box::new(builder));
    }

    pub fn live_adapters(&self) -> Vec<String> {
        let mut names: Vec<String> = self.live_adapters.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn create(&self, config: &AppConfig) -> AppResult<Arc<dyn MarketVenue>> {
        match config.mode {
            TradingMode::Paper => {
                info!(
                    "paper venue: cash {:.2}, slippage {} bps",
                    config.initial_balance, config.venue.paper_slippage_bps
                );
                Ok(Arc::new(PaperVenue::new(paper_config(config))))
            }
            TradingMode::Live => {
                if !config.venue.has_credentials() {
                    return Err(AppError::Config(
                        "live trading requires VENUE_API_KEY and VENUE_API_SECRET".to_string(),
                    ));
                }
                let name = config.venue.name.to_lowercase();
                let builder = self.live_adapters.get(&name).ok_or_else(|| {
                    AppError::Config(format!(
                        "no live adapter registered for venue '{}' (available: {:?})",
                        config.venue.name,
                        self.live_adapters()
                    ))
                })?;
                info!("live venue: {}", name);
                builder(&config.venue)
            }
        }
    }
}

fn paper_config(config: &AppConfig) -> PaperVenueConfig {
    let seed_prices = config
        .instruments
        .iter()
        .filter_map(|symbol| Instrument::new(symbol).ok())
        .map(|instrument| {
            let price = seed_price(&instrument);
            (instrument, price)
        })
        .collect();
    PaperVenueConfig {
        initial_cash: config.initial_balance,
        slippage_bps: config.venue.paper_slippage_bps,
        seed_prices,
        ..Default::default()
    }
}

/// Rough starting levels so paper runs trade at plausible prices
fn seed_price(instrument: &Instrument) -> f64 {
    match instrument.base() {
        "BTC" => 65_000.0,
        "ETH" => 3_500.0,
        "SOL" => 150.0,
        "BNB" => 550.0,
        "AVAX" => 35.0,
        "MATIC" => 0.7,
        _ => super::paper_venue::DEFAULT_SEED_PRICE,
    }
}
