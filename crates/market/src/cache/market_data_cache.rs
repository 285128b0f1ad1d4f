use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, warn};

use quant_pilot_domain::{Candle, Instrument, MarketSnapshot, Quote};

use crate::indicators;

pub const DEFAULT_CANDLE_WINDOW: usize = 500;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("instrument {0} is not tracked")]
    UnknownInstrument(String),

    #[error("invalid price {price} for {instrument}")]
    InvalidPrice { instrument: String, price: f64 },

    #[error("indicator computation failed: {0}")]
    Indicator(String),
}

/// Latest market state per tracked instrument.
///
/// Written by the scan cycle and the streaming feed, read by the signal and
/// execution cycles. Each instrument keeps at most `window` candles, newest last.
pub struct MarketDataCache {
    snapshots: DashMap<Instrument, MarketSnapshot>,
    window: usize,
}

impl MarketDataCache {
    pub fn new(instruments: &[Instrument], window: usize) -> Self {
        let snapshots = DashMap::new();
        for instrument in instruments {
            snapshots.insert(instrument.clone(), MarketSnapshot::new(instrument.clone()));
        }
        Self {
            snapshots,
            window: window.max(1),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Starts tracking `instrument`; no-op if already tracked
    pub fn track(&self, instrument: &Instrument) {
        self.snapshots
            .entry(instrument.clone())
            .or_insert_with(|| MarketSnapshot::new(instrument.clone()));
    }

    pub fn is_tracked(&self, instrument: &Instrument) -> bool {
        self.snapshots.contains_key(instrument)
    }

    pub fn instruments(&self) -> Vec<Instrument> {
        let mut list: Vec<Instrument> = self.snapshots.iter().map(|e| e.key().clone()).collect();
        list.sort();
        list
    }

    /// Owned copy of the snapshot
    pub fn snapshot(&self, instrument: &Instrument) -> Option<MarketSnapshot> {
        self.snapshots.get(instrument).map(|s| s.value().clone())
    }

    /// Candles fed to the predictor, oldest first
    pub fn feature_window(&self, instrument: &Instrument) -> Vec<Candle> {
        self.snapshots
            .get(instrument)
            .map(|s| s.candles.clone())
            .unwrap_or_default()
    }

    /// Last known price for every instrument that has one
    pub fn prices(&self) -> HashMap<Instrument, f64> {
        self.snapshots
            .iter()
            .filter(|e| e.value().has_price())
            .map(|e| (e.key().clone(), e.value().price))
            .collect()
    }

    pub fn apply_quote(&self, quote: &Quote) -> Result<(), SnapshotError> {
        let mut entry = self.entry_mut(&quote.instrument)?;
        let snapshot = entry.value_mut();
        update_price(snapshot, quote.price, quote.timestamp)?;
        snapshot.volume = quote.volume;
        snapshot.bid = quote.bid;
        snapshot.ask = quote.ask;
        Ok(())
    }

    /// Streaming price update; volume is kept when the tick carries none
    pub fn apply_tick(
        &self,
        instrument: &Instrument,
        price: f64,
        volume: Option<f64>,
        at: DateTime<Utc>,
    ) -> Result<(), SnapshotError> {
        let mut entry = self.entry_mut(instrument)?;
        let snapshot = entry.value_mut();
        update_price(snapshot, price, at)?;
        if let Some(volume) = volume {
            snapshot.volume = volume;
        }
        Ok(())
    }

    /// Merges `candles` by timestamp (incoming wins), keeps the newest
    /// `window` and recomputes volatility and indicators.
    ///
    /// Invalid candles are dropped with a warning.
    pub fn apply_candles(
        &self,
        instrument: &Instrument,
        candles: &[Candle],
    ) -> Result<(), SnapshotError> {
        let mut entry = self.entry_mut(instrument)?;
        let snapshot = entry.value_mut();

        let mut merged: BTreeMap<DateTime<Utc>, Candle> =
            snapshot.candles.iter().map(|c| (c.timestamp, *c)).collect();
        for candle in candles {
            if let Err(e) = candle.validate() {
                warn!("{}: dropping candle: {}", instrument, e);
                continue;
            }
            merged.insert(candle.timestamp, *candle);
        }

        let skip = merged.len().saturating_sub(self.window);
        snapshot.candles = merged.into_values().skip(skip).collect();
        snapshot.volatility = indicators::volatility(&snapshot.candles);
        snapshot.indicators = indicators::compute_indicators(&snapshot.candles)?;

        if !snapshot.has_price() {
            if let Some(last) = snapshot.candles.last() {
                snapshot.price = last.close;
                snapshot.volume = last.volume;
                snapshot.timestamp = last.timestamp;
            }
        }
        debug!(
            "{}: {} candles, volatility {:.4}",
            instrument,
            snapshot.candles.len(),
            snapshot.volatility
        );
        Ok(())
    }

    fn entry_mut(
        &self,
        instrument: &Instrument,
    ) -> Result<dashmap::mapref::one::RefMut<'_, Instrument, MarketSnapshot>, SnapshotError> {
        self.snapshots
            .get_mut(instrument)
            .ok_or_else(|| SnapshotError::UnknownInstrument(instrument.to_string()))
    }
}

fn update_price(
    snapshot: &mut MarketSnapshot,
    price: f64,
    at: DateTime<Utc>,
) -> Result<(), SnapshotError> {
    if !(price.is_finite() && price > 0.0) {
        return Err(SnapshotError::InvalidPrice {
            instrument: snapshot.instrument.to_string(),
            price,
        });
    }
    snapshot.price_change_pct = if snapshot.price > 0.0 {
        (price - snapshot.price) / snapshot.price
    } else {
        0.0
    };
    snapshot.price = price;
    snapshot.timestamp = at;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn btc() -> Instrument {
        Instrument::new("BTC/USDT").unwrap()
    }

    fn candle_at(minutes: i64, close: f64) -> Candle {
        let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        Candle {
            timestamp: base + Duration::minutes(minutes),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 10.0,
        }
    }

    fn quote(price: f64) -> Quote {
        Quote {
            instrument: btc(),
            price,
            volume: 5.0,
            bid: Some(price - 0.5),
            ask: Some(price + 0.5),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_quote_tracks_price_change() {
        let cache = MarketDataCache::new(&[btc()], 10);
        cache.apply_quote(&quote(100.0)).unwrap();
        assert_eq!(cache.snapshot(&btc()).unwrap().price_change_pct, 0.0);

        cache.apply_quote(&quote(102.0)).unwrap();
        let snapshot = cache.snapshot(&btc()).unwrap();
        assert_relative_eq!(snapshot.price_change_pct, 0.02);
        assert_eq!(snapshot.bid, Some(101.5));
    }

    #[test]
    fn test_unknown_instrument_and_bad_price() {
        let cache = MarketDataCache::new(&[btc()], 10);
        let eth = Instrument::new("ETH/USDT").unwrap();
        assert!(matches!(
            cache.apply_tick(&eth, 10.0, None, Utc::now()),
            Err(SnapshotError::UnknownInstrument(_))
        ));
        assert!(matches!(
            cache.apply_tick(&btc(), -1.0, None, Utc::now()),
            Err(SnapshotError::InvalidPrice { .. })
        ));
        assert!(cache.prices().is_empty());
    }

    #[test]
    fn test_candles_merge_by_timestamp_and_respect_window() {
        let cache = MarketDataCache::new(&[btc()], 5);
        let first: Vec<Candle> = (0..4).map(|i| candle_at(i, 100.0 + i as f64)).collect();
        cache.apply_candles(&btc(), &first).unwrap();

        // overlaps minute 3, adds 4..8
        let second: Vec<Candle> = (3..8).map(|i| candle_at(i, 200.0 + i as f64)).collect();
        cache.apply_candles(&btc(), &second).unwrap();

        let window = cache.feature_window(&btc());
        assert_eq!(window.len(), 5);
        assert_eq!(window.first().unwrap().close, 203.0);
        assert_eq!(window.last().unwrap().close, 207.0);
        assert!(window.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_invalid_candles_dropped() {
        let cache = MarketDataCache::new(&[btc()], 10);
        let mut bad = candle_at(1, 100.0);
        bad.high = 50.0;
        cache.apply_candles(&btc(), &[candle_at(0, 100.0), bad]).unwrap();
        assert_eq!(cache.feature_window(&btc()).len(), 1);
    }

    #[test]
    fn test_candles_seed_price_when_no_quote_yet() {
        let cache = MarketDataCache::new(&[btc()], 10);
        cache
            .apply_candles(&btc(), &[candle_at(0, 100.0), candle_at(1, 101.0)])
            .unwrap();
        assert_eq!(cache.prices().get(&btc()), Some(&101.0));
    }
}
