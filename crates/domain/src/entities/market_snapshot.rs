//! Per-instrument market state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Candle;
use crate::value_objects::{IndicatorBundle, Instrument};

/// Latest price, derived statistics and a bounded candle history for one
/// instrument. Candles are kept oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub instrument: Instrument,
    pub price: f64,
    pub volume: f64,
    /// Standard deviation of close-to-close returns over the window
    pub volatility: f64,
    /// Change against the previous quote, as a fraction
    pub price_change_pct: f64,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub indicators: IndicatorBundle,
    pub candles: Vec<Candle>,
}

impl MarketSnapshot {
    pub fn new(instrument: Instrument) -> Self {
        Self {
            instrument,
            price: 0.0,
            volume: 0.0,
            volatility: 0.0,
            price_change_pct: 0.0,
            bid: None,
            ask: None,
            timestamp: Utc::now(),
            indicators: IndicatorBundle::default(),
            candles: Vec::new(),
        }
    }

    /// A snapshot without a positive price cannot be traded on
    pub fn has_price(&self) -> bool {
        self.price > 0.0
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn last_candle(&self) -> Option<&Candle> {
        self.candles.last()
    }
}
