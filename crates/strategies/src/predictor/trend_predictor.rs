//! EMA-spread trend predictor
//!
//! Stand-in for an external model. Scores the gap between a fast and a slow
//! EMA of closes, scaled by return volatility, and maps it to probabilities:
//!
//! - `z = spread / max(volatility, 1e-4)`, clipped to ±6
//! - `hold = 0.5 * e^-|z|`, `buy = (1 - hold) * σ(z)`, `sell = (1 - hold) * (1 - σ(z))`
//! - predicted price = last close × (1 + spread)

use async_trait::async_trait;
use ta::indicators::ExponentialMovingAverage;
use ta::Next;

use quant_pilot_domain::{
    Candle, Forecast, ForecastDirection, Instrument, Predictor, PredictorError, Probabilities,
};

pub struct TrendPredictor {
    fast: usize,
    slow: usize,
}

impl TrendPredictor {
    pub fn new(fast: usize, slow: usize) -> Result<Self, PredictorError> {
        if fast == 0 || fast >= slow {
            return Err(PredictorError::Failed(format!(
                "fast period {} must be positive and below slow period {}",
                fast, slow
            )));
        }
        Ok(Self { fast, slow })
    }

    pub fn min_window(&self) -> usize {
        self.slow
    }

    fn forecast(&self, closes: &[f64]) -> Result<Forecast, PredictorError> {
        let mut fast = ExponentialMovingAverage::new(self.fast)
            .map_err(|e| PredictorError::Failed(format!("{:?}", e)))?;
        let mut slow = ExponentialMovingAverage::new(self.slow)
            .map_err(|e| PredictorError::Failed(format!("{:?}", e)))?;
        let (mut fast_value, mut slow_value) = (0.0, 0.0);
        for close in closes {
            fast_value = fast.next(*close);
            slow_value = slow.next(*close);
        }
        let last = closes.last().copied().unwrap_or_default();
        if slow_value <= 0.0 || last <= 0.0 {
            return Err(PredictorError::Failed("non-positive prices in window".to_string()));
        }

        let spread = (fast_value - slow_value) / slow_value;
        let z = (spread / return_volatility(closes).max(1e-4)).clamp(-6.0, 6.0);
        let up = 1.0 / (1.0 + (-z).exp());
        let hold = 0.5 * (-z.abs()).exp();
        let probabilities = Probabilities::normalized((1.0 - hold) * up, hold, (1.0 - hold) * (1.0 - up));

        let direction = if probabilities.buy > probabilities.sell && probabilities.buy > probabilities.hold {
            ForecastDirection::Up
        } else if probabilities.sell > probabilities.buy && probabilities.sell > probabilities.hold {
            ForecastDirection::Down
        } else {
            ForecastDirection::Neutral
        };
        let confidence = probabilities
            .buy
            .max(probabilities.sell)
            .max(probabilities.hold);

        Ok(Forecast {
            confidence,
            direction,
            predicted_price: last * (1.0 + spread),
            probabilities,
        })
    }
}

impl Default for TrendPredictor {
    fn default() -> Self {
        Self { fast: 12, slow: 26 }
    }
}

fn return_volatility(closes: &[f64]) -> f64 {
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    (returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt()
}

#[async_trait]
impl Predictor for TrendPredictor {
    fn name(&self) -> &str {
        "trend_ema"
    }

    async fn predict(
        &self,
        _instrument: &Instrument,
        window: &[Candle],
    ) -> Result<Forecast, PredictorError> {
        if window.len() < self.min_window() {
            return Err(PredictorError::InsufficientData {
                needed: self.min_window(),
                got: window.len(),
            });
        }
        let closes: Vec<f64> = window.iter().map(|c| c.close).collect();
        self.forecast(&closes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, Utc};

    fn window(closes: impl Iterator<Item = f64>) -> Vec<Candle> {
        let start = Utc::now();
        closes
            .enumerate()
            .map(|(i, c)| Candle {
                timestamp: start + Duration::minutes(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 1.0,
            })
            .collect()
    }

    fn instrument() -> Instrument {
        Instrument::new("ETH/USDT").unwrap()
    }

    #[tokio::test]
    async fn test_uptrend_forecasts_up() {
        // steady +1% per bar with a little noise
        let closes = (0..60).map(|i| 100.0 * 1.01f64.powi(i) * if i % 2 == 0 { 1.001 } else { 0.999 });
        let forecast = TrendPredictor::default()
            .predict(&instrument(), &window(closes))
            .await
            .unwrap();
        assert_eq!(forecast.direction, ForecastDirection::Up);
        assert!(forecast.confidence > 0.65);
        let p = forecast.probabilities;
        assert_relative_eq!(p.buy + p.hold + p.sell, 1.0, epsilon = 1e-9);
        let last = 100.0 * 1.01f64.powi(59) * 0.999;
        assert!(forecast.predicted_price > last);
    }

    #[tokio::test]
    async fn test_downtrend_forecasts_down() {
        let closes = (0..60).map(|i| 100.0 * 0.99f64.powi(i) * if i % 2 == 0 { 1.001 } else { 0.999 });
        let forecast = TrendPredictor::default()
            .predict(&instrument(), &window(closes))
            .await
            .unwrap();
        assert_eq!(forecast.direction, ForecastDirection::Down);
    }

    #[tokio::test]
    async fn test_flat_market_is_neutral() {
        let forecast = TrendPredictor::default()
            .predict(&instrument(), &window(std::iter::repeat(50.0).take(40)))
            .await
            .unwrap();
        assert_eq!(forecast.direction, ForecastDirection::Neutral);
        assert_relative_eq!(forecast.predicted_price, 50.0);
    }

    #[tokio::test]
    async fn test_short_window_is_insufficient() {
        let err = TrendPredictor::default()
            .predict(&instrument(), &window(std::iter::repeat(50.0).take(10)))
            .await
            .unwrap_err();
        assert_eq!(err, PredictorError::InsufficientData { needed: 26, got: 10 });
    }

    #[test]
    fn test_invalid_periods() {
        assert!(TrendPredictor::new(26, 12).is_err());
        assert!(TrendPredictor::new(0, 12).is_err());
        assert_eq!(TrendPredictor::new(5, 20).unwrap().min_window(), 20);
    }
}
