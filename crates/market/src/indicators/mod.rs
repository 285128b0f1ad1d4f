//! Indicator bundle computed from a candle window with the `ta` crate

use ta::indicators::{
    BollingerBands, ExponentialMovingAverage, MovingAverageConvergenceDivergence,
    RelativeStrengthIndex,
};
use ta::Next;

use quant_pilot_domain::{BollingerValue, Candle, EmaValue, IndicatorBundle, MacdValue};

use crate::cache::SnapshotError;

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_MULTIPLIER: f64 = 2.0;
pub const EMA_FAST: usize = 12;
pub const EMA_SLOW: usize = 26;

fn ta_error(name: &str, e: ta::errors::TaError) -> SnapshotError {
    SnapshotError::Indicator(format!("{}: {:?}", name, e))
}

/// Computes RSI 14, MACD 12/26/9, Bollinger 20/2.0 and EMA 12/26 over the closes.
///
/// `ta` indicators start emitting from the first value, so each field is only
/// filled once the window covers its warm-up period.
pub fn compute_indicators(candles: &[Candle]) -> Result<IndicatorBundle, SnapshotError> {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let mut bundle = IndicatorBundle::default();
    if closes.is_empty() {
        return Ok(bundle);
    }

    if closes.len() > RSI_PERIOD {
        let mut rsi = RelativeStrengthIndex::new(RSI_PERIOD).map_err(|e| ta_error("rsi", e))?;
        bundle.rsi = closes.iter().map(|c| rsi.next(*c)).last();
    }

    if closes.len() >= MACD_SLOW + MACD_SIGNAL {
        let mut macd = MovingAverageConvergenceDivergence::new(MACD_FAST, MACD_SLOW, MACD_SIGNAL)
            .map_err(|e| ta_error("macd", e))?;
        bundle.macd = closes.iter().map(|c| macd.next(*c)).last().map(|out| MacdValue {
            macd: out.macd,
            signal: out.signal,
            histogram: out.histogram,
        });
    }

    if closes.len() >= BOLLINGER_PERIOD {
        let mut bb = BollingerBands::new(BOLLINGER_PERIOD, BOLLINGER_MULTIPLIER)
            .map_err(|e| ta_error("bollinger", e))?;
        bundle.bollinger = closes.iter().map(|c| bb.next(*c)).last().map(|out| BollingerValue {
            upper: out.upper,
            middle: out.average,
            lower: out.lower,
        });
    }

    if closes.len() >= EMA_SLOW {
        let mut fast = ExponentialMovingAverage::new(EMA_FAST).map_err(|e| ta_error("ema", e))?;
        let mut slow = ExponentialMovingAverage::new(EMA_SLOW).map_err(|e| ta_error("ema", e))?;
        let mut last = None;
        for close in &closes {
            last = Some(EmaValue {
                ema12: fast.next(*close),
                ema26: slow.next(*close),
            });
        }
        bundle.ema = last;
    }

    Ok(bundle)
}

/// Close-to-close simple returns
pub fn returns(candles: &[Candle]) -> Vec<f64> {
    candles
        .windows(2)
        .filter(|w| w[0].close > 0.0)
        .map(|w| (w[1].close - w[0].close) / w[0].close)
        .collect()
}

/// Population standard deviation of close-to-close returns; 0 with fewer than two returns
pub fn volatility(candles: &[Candle]) -> f64 {
    let rets = returns(candles);
    if rets.len() < 2 {
        return 0.0;
    }
    let n = rets.len() as f64;
    let mean = rets.iter().sum::<f64>() / n;
    let variance = rets.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, Utc};

    fn candles(closes: &[f64]) -> Vec<Candle> {
        let start = Utc::now() - Duration::minutes(closes.len() as i64);
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| Candle {
                timestamp: start + Duration::minutes(i as i64),
                open: *c,
                high: *c,
                low: *c,
                close: *c,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn test_short_window_leaves_fields_empty() {
        let bundle = compute_indicators(&candles(&[100.0; 10])).unwrap();
        assert_eq!(bundle, IndicatorBundle::default());
    }

    #[test]
    fn test_full_window_fills_every_field() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let bundle = compute_indicators(&candles(&closes)).unwrap();
        assert!(bundle.is_complete());

        let rsi = bundle.rsi.unwrap();
        assert!(rsi > 70.0, "steady uptrend should be overbought, got {}", rsi);
        assert!(bundle.macd.unwrap().macd > 0.0);
        let ema = bundle.ema.unwrap();
        assert!(ema.ema12 > ema.ema26);
        let bb = bundle.bollinger.unwrap();
        assert!(bb.lower < bb.middle && bb.middle < bb.upper);
    }

    #[test]
    fn test_volatility() {
        assert_eq!(volatility(&candles(&[100.0, 101.0])), 0.0);
        assert_relative_eq!(volatility(&candles(&[100.0; 30])), 0.0);

        // returns +10%, -10%, +10%
        let v = volatility(&candles(&[100.0, 110.0, 99.0, 108.9]));
        assert!(v > 0.09 && v < 0.11);
    }
}
