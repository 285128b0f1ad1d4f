use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use quant_pilot_core::RiskSettings;
use quant_pilot_domain::Instrument;

/// Mutable risk limits and balance tracking.
///
/// `peak_balance` never decreases and `current_drawdown` is always >= 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskState {
    pub peak_balance: f64,
    pub current_balance: f64,
    /// Fraction below the peak (0.1 = 10%)
    pub current_drawdown: f64,
    pub risk_per_trade: f64,
    pub max_open_positions: usize,
    /// Notional cap per position
    pub max_position_size: f64,
    pub max_drawdown: f64,
    #[serde(skip)]
    correlation_cache: HashMap<(String, String), f64>,
}

impl RiskState {
    pub fn new(initial_balance: f64, settings: &RiskSettings) -> Self {
        let balance = initial_balance.max(0.0);
        Self {
            peak_balance: balance,
            current_balance: balance,
            current_drawdown: 0.0,
            risk_per_trade: settings.risk_per_trade,
            max_open_positions: settings.max_open_positions,
            max_position_size: settings.max_position_size,
            max_drawdown: settings.max_drawdown,
            correlation_cache: HashMap::new(),
        }
    }

    /// Records a new balance, raising the peak if exceeded and recomputing drawdown
    pub fn update_balance(&mut self, balance: f64) {
        self.current_balance = balance;
        if balance > self.peak_balance {
            self.peak_balance = balance;
        }
        self.current_drawdown = if self.peak_balance > 0.0 {
            ((self.peak_balance - balance) / self.peak_balance).max(0.0)
        } else {
            0.0
        };
    }

    fn pair_key(a: &Instrument, b: &Instrument) -> (String, String) {
        if a.symbol() <= b.symbol() {
            (a.symbol().to_string(), b.symbol().to_string())
        } else {
            (b.symbol().to_string(), a.symbol().to_string())
        }
    }

    pub fn cached_correlation(&self, a: &Instrument, b: &Instrument) -> Option<f64> {
        self.correlation_cache.get(&Self::pair_key(a, b)).copied()
    }

    pub fn remember_correlation(&mut self, a: &Instrument, b: &Instrument, value: f64) {
        self.correlation_cache.insert(Self::pair_key(a, b), value);
    }

    pub fn correlation_cache_len(&self) -> usize {
        self.correlation_cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_peak_only_increases() {
        let mut state = RiskState::new(10_000.0, &RiskSettings::default());
        state.update_balance(9_000.0);
        assert_eq!(state.peak_balance, 10_000.0);
        assert_relative_eq!(state.current_drawdown, 0.1);

        state.update_balance(12_000.0);
        assert_eq!(state.peak_balance, 12_000.0);
        assert_eq!(state.current_drawdown, 0.0);

        state.update_balance(11_400.0);
        assert_relative_eq!(state.current_drawdown, 0.05);
    }

    #[test]
    fn test_correlation_cache_is_symmetric() {
        let mut state = RiskState::new(1_000.0, &RiskSettings::default());
        let sol = Instrument::new("SOL/USDT").unwrap();
        let avax = Instrument::new("AVAX/USDT").unwrap();
        state.remember_correlation(&sol, &avax, 0.7);
        assert_eq!(state.cached_correlation(&avax, &sol), Some(0.7));
        assert_eq!(state.correlation_cache_len(), 1);
    }
}
