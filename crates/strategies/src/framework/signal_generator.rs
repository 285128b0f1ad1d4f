//! Forecast-driven signal generation

use tracing::debug;

use quant_pilot_core::SignalSettings;
use quant_pilot_domain::{
    Forecast, ForecastDirection, MarketSnapshot, OrderSide, Signal, SignalMetadata,
};

pub const GENERATOR_SOURCE: &str = "predictor_ensemble";

/// Stop-loss and take-profit at fixed percentage offsets from `price`.
///
/// BUY puts the stop below and the target above; SELL mirrors.
pub fn protective_levels(action: OrderSide, price: f64, stop_pct: f64, take_pct: f64) -> (f64, f64) {
    match action {
        OrderSide::Buy => (price * (1.0 - stop_pct), price * (1.0 + take_pct)),
        OrderSide::Sell => (price * (1.0 + stop_pct), price * (1.0 - take_pct)),
    }
}

/// Turns a forecast into at most one signal.
///
/// Gates, in order: confidence strictly above the threshold, absolute
/// predicted move strictly above the minimum, a non-neutral direction whose
/// sign agrees with the predicted move.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    settings: SignalSettings,
}

impl SignalGenerator {
    pub fn new(settings: SignalSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SignalSettings {
        &self.settings
    }

    pub fn generate(&self, snapshot: &MarketSnapshot, forecast: Option<&Forecast>) -> Option<Signal> {
        let forecast = forecast?;
        let instrument = &snapshot.instrument;
        if !snapshot.has_price() {
            debug!("{}: no price, skipping", instrument);
            return None;
        }

        if forecast.confidence <= self.settings.confidence_threshold {
            debug!(
                "{}: confidence {:.3} not above {:.3}",
                instrument, forecast.confidence, self.settings.confidence_threshold
            );
            return None;
        }

        let change = forecast.price_change(snapshot.price);
        if change.abs() <= self.settings.min_price_change {
            debug!(
                "{}: predicted move {:.4} within {:.4}",
                instrument, change, self.settings.min_price_change
            );
            return None;
        }

        let action = match forecast.direction {
            ForecastDirection::Up if change > 0.0 => OrderSide::Buy,
            ForecastDirection::Down if change < 0.0 => OrderSide::Sell,
            ForecastDirection::Neutral => return None,
            direction => {
                debug!(
                    "{}: direction {} disagrees with predicted move {:.4}",
                    instrument, direction, change
                );
                return None;
            }
        };

        let (stop_loss, take_profit) = protective_levels(
            action,
            snapshot.price,
            self.settings.stop_loss_pct,
            self.settings.take_profit_pct,
        );
        let metadata = SignalMetadata {
            price_change_pct: change,
            volume: snapshot.volume,
            volatility: snapshot.volatility,
            indicators: snapshot.indicators,
            source: GENERATOR_SOURCE.to_string(),
        };

        match Signal::new(
            instrument.clone(),
            action,
            snapshot.price,
            forecast.predicted_price,
            stop_loss,
            take_profit,
            forecast.confidence.clamp(0.0, 1.0),
            self.settings.timeframe.clone(),
            metadata,
        ) {
            Ok(signal) => Some(signal),
            Err(e) => {
                debug!("{}: signal discarded: {}", instrument, e);
                None
            }
        }
    }
}
