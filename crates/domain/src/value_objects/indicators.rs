//! Technical indicator readings carried by snapshots and signal metadata

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerValue {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerValue {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmaValue {
    pub ema12: f64,
    pub ema26: f64,
}

/// Latest indicator values; a field stays `None` until the candle window is
/// long enough to compute it
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorBundle {
    pub rsi: Option<f64>,
    pub macd: Option<MacdValue>,
    pub bollinger: Option<BollingerValue>,
    pub ema: Option<EmaValue>,
}

impl IndicatorBundle {
    pub fn is_complete(&self) -> bool {
        self.rsi.is_some() && self.macd.is_some() && self.bollinger.is_some() && self.ema.is_some()
    }
}
