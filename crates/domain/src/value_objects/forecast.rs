//! Predictor output

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastDirection {
    Up,
    Down,
    Neutral,
}

impl fmt::Display for ForecastDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastDirection::Up => f.write_str("up"),
            ForecastDirection::Down => f.write_str("down"),
            ForecastDirection::Neutral => f.write_str("neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub buy: f64,
    pub hold: f64,
    pub sell: f64,
}

impl Probabilities {
    /// Scales the three values so they sum to one; all-zero input becomes pure hold
    pub fn normalized(buy: f64, hold: f64, sell: f64) -> Self {
        let buy = buy.max(0.0);
        let hold = hold.max(0.0);
        let sell = sell.max(0.0);
        let total = buy + hold + sell;
        if total <= 0.0 {
            return Self {
                buy: 0.0,
                hold: 1.0,
                sell: 0.0,
            };
        }
        Self {
            buy: buy / total,
            hold: hold / total,
            sell: sell / total,
        }
    }
}

/// Probabilistic directional forecast for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub confidence: f64,
    pub direction: ForecastDirection,
    pub predicted_price: f64,
    pub probabilities: Probabilities,
}

impl Forecast {
    /// Predicted move relative to `current_price`, as a fraction (0.02 = +2%)
    pub fn price_change(&self, current_price: f64) -> f64 {
        if current_price <= 0.0 {
            return 0.0;
        }
        (self.predicted_price - current_price) / current_price
    }
}
