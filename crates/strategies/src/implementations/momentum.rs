//! RSI + MACD histogram momentum

use quant_pilot_core::SignalSettings;
use quant_pilot_domain::{MarketSnapshot, OrderSide, Signal, SignalMetadata};

use crate::error::StrategyError;
use crate::framework::protective_levels;

pub const MOMENTUM_NAME: &str = "momentum";

/// BUY when the MACD histogram is positive and RSI sits in (50, 70);
/// SELL when the histogram is negative and RSI sits in (30, 50).
///
/// Confidence starts at 0.5 and gains up to 0.25 each from RSI distance to 50
/// and from histogram size relative to 0.5% of price.
#[derive(Debug, Clone)]
pub struct MomentumStrategy {
    settings: SignalSettings,
}

impl MomentumStrategy {
    pub fn new(settings: SignalSettings) -> Self {
        Self { settings }
    }

    pub fn analyze(&self, snapshot: &MarketSnapshot) -> Result<Option<Signal>, StrategyError> {
        if !snapshot.has_price() {
            return Err(StrategyError::NoPrice(snapshot.instrument.to_string()));
        }
        let (Some(rsi), Some(macd)) = (snapshot.indicators.rsi, snapshot.indicators.macd) else {
            return Ok(None);
        };

        let hist = macd.histogram;
        let action = if hist > 0.0 && rsi > 50.0 && rsi < 70.0 {
            OrderSide::Buy
        } else if hist < 0.0 && rsi > 30.0 && rsi < 50.0 {
            OrderSide::Sell
        } else {
            return Ok(None);
        };

        let rsi_strength = ((rsi - 50.0).abs() / 20.0).min(1.0);
        let hist_strength = (hist.abs() / (snapshot.price * 0.005)).min(1.0);
        let confidence = (0.5 + 0.25 * rsi_strength + 0.25 * hist_strength).clamp(0.0, 1.0);

        let (stop_loss, take_profit) = protective_levels(
            action,
            snapshot.price,
            self.settings.stop_loss_pct,
            self.settings.take_profit_pct,
        );
        let signal = Signal::new(
            snapshot.instrument.clone(),
            action,
            snapshot.price,
            take_profit,
            stop_loss,
            take_profit,
            confidence,
            self.settings.timeframe.clone(),
            SignalMetadata {
                price_change_pct: snapshot.price_change_pct,
                volume: snapshot.volume,
                volatility: snapshot.volatility,
                indicators: snapshot.indicators,
                source: MOMENTUM_NAME.to_string(),
            },
        )?;
        Ok(Some(signal))
    }
}
