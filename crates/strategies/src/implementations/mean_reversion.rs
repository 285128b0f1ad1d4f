//! Bollinger band mean reversion

use quant_pilot_core::SignalSettings;
use quant_pilot_domain::{MarketSnapshot, OrderSide, Signal, SignalMetadata};

use crate::error::StrategyError;

pub const MEAN_REVERSION_NAME: &str = "mean_reversion";

/// BUY below the lower band, SELL above the upper band, targeting the middle band.
///
/// Confidence grows from 0.6 with penetration depth measured in half band widths.
#[derive(Debug, Clone)]
pub struct MeanReversionStrategy {
    settings: SignalSettings,
}

impl MeanReversionStrategy {
    pub fn new(settings: SignalSettings) -> Self {
        Self { settings }
    }

    pub fn analyze(&self, snapshot: &MarketSnapshot) -> Result<Option<Signal>, StrategyError> {
        if !snapshot.has_price() {
            return Err(StrategyError::NoPrice(snapshot.instrument.to_string()));
        }
        let Some(bands) = snapshot.indicators.bollinger else {
            return Ok(None);
        };
        let half_width = bands.width() / 2.0;
        if half_width <= 0.0 {
            return Ok(None);
        }

        let price = snapshot.price;
        let (action, depth, stop_loss) = if price < bands.lower {
            (
                OrderSide::Buy,
                (bands.lower - price) / half_width,
                price * (1.0 - self.settings.stop_loss_pct),
            )
        } else if price > bands.upper {
            (
                OrderSide::Sell,
                (price - bands.upper) / half_width,
                price * (1.0 + self.settings.stop_loss_pct),
            )
        } else {
            return Ok(None);
        };
        let confidence = (0.6 + 0.4 * depth.min(1.0)).clamp(0.0, 1.0);

        let signal = Signal::new(
            snapshot.instrument.clone(),
            action,
            price,
            bands.middle,
            stop_loss,
            bands.middle,
            confidence,
            self.settings.timeframe.clone(),
            SignalMetadata {
                price_change_pct: (bands.middle - price) / price,
                volume: snapshot.volume,
                volatility: snapshot.volatility,
                indicators: snapshot.indicators,
                source: MEAN_REVERSION_NAME.to_string(),
            },
        )?;
        Ok(Some(signal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use quant_pilot_domain::{BollingerValue, Instrument};

    fn snapshot(price: f64) -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::new(Instrument::new("MSFT").unwrap());
        snapshot.price = price;
        snapshot.indicators.bollinger = Some(BollingerValue {
            upper: 110.0,
            middle: 100.0,
            lower: 90.0,
        });
        snapshot
    }

    #[test]
    fn test_buy_below_lower_band() {
        let strategy = MeanReversionStrategy::new(SignalSettings::default());
        let signal = strategy.analyze(&snapshot(85.0)).unwrap().unwrap();
        assert_eq!(signal.action, OrderSide::Buy);
        assert_relative_eq!(signal.target_price, 100.0);
        assert_relative_eq!(signal.take_profit, 100.0);
        assert_relative_eq!(signal.confidence, 0.8);
    }

    #[test]
    fn test_sell_above_upper_band() {
        let strategy = MeanReversionStrategy::new(SignalSettings::default());
        let signal = strategy.analyze(&snapshot(125.0)).unwrap().unwrap();
        assert_eq!(signal.action, OrderSide::Sell);
        assert_relative_eq!(signal.confidence, 1.0);
        assert!(signal.stop_loss > 125.0);
    }

    #[test]
    fn test_inside_bands_no_signal() {
        let strategy = MeanReversionStrategy::new(SignalSettings::default());
        assert!(strategy.analyze(&snapshot(100.0)).unwrap().is_none());
        assert!(matches!(
            strategy.analyze(&snapshot(0.0)),
            Err(StrategyError::NoPrice(_))
        ));
    }
}
