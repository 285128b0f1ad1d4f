//! Trade signal value object

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{IndicatorBundle, Instrument};
use crate::enums::OrderSide;
use crate::error::DomainError;

/// Market context captured when the signal was generated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalMetadata {
    /// Predicted (or observed) move, as a fraction
    pub price_change_pct: f64,
    pub volume: f64,
    pub volatility: f64,
    pub indicators: IndicatorBundle,
    /// Name of the strategy that produced the signal
    pub source: String,
}

/// Proposed trade.
///
/// Immutable once built. The constructor guarantees
/// `stop_loss < price < take_profit` for BUY and the reverse for SELL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub instrument: Instrument,
    pub action: OrderSide,
    /// Price at generation time
    pub price: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub confidence: f64,
    pub timeframe: String,
    pub created_at: DateTime<Utc>,
    pub metadata: SignalMetadata,
}

impl Signal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instrument: Instrument,
        action: OrderSide,
        price: f64,
        target_price: f64,
        stop_loss: f64,
        take_profit: f64,
        confidence: f64,
        timeframe: impl Into<String>,
        metadata: SignalMetadata,
    ) -> Result<Self, DomainError> {
        if !(price.is_finite() && price > 0.0) {
            return Err(DomainError::InvalidSignal(format!(
                "{} price must be positive, got {}",
                instrument, price
            )));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(DomainError::InvalidSignal(format!(
                "{} confidence {} outside [0, 1]",
                instrument, confidence
            )));
        }
        let ordered = match action {
            OrderSide::Buy => stop_loss < price && price < take_profit,
            OrderSide::Sell => take_profit < price && price < stop_loss,
        };
        if !ordered || stop_loss <= 0.0 || take_profit <= 0.0 {
            return Err(DomainError::InvalidSignal(format!(
                "{} {} levels out of order: stop {} price {} target {}",
                action, instrument, stop_loss, price, take_profit
            )));
        }

        let created_at = Utc::now();
        Ok(Self {
            id: Self::generate_id(created_at),
            instrument,
            action,
            price,
            target_price,
            stop_loss,
            take_profit,
            confidence,
            timeframe: timeframe.into(),
            created_at,
            metadata,
        })
    }

    /// `sig_<epoch millis>_<8 hex chars>`
    fn generate_id(at: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("sig_{}_{}", at.timestamp_millis(), &suffix[..8])
    }

    /// Overrides the generation time, keeping the id
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// Strictly older than `max_age`
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) > max_age
    }

    /// Distance between entry and stop
    pub fn stop_distance(&self) -> f64 {
        (self.price - self.stop_loss).abs()
    }

    /// Reward over risk, `|target - price| / |price - stop|`; zero when the
    /// stop sits on the entry
    pub fn reward_risk_ratio(&self) -> f64 {
        let risk = self.stop_distance();
        if risk <= f64::EPSILON {
            return 0.0;
        }
        (self.target_price - self.price).abs() / risk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn btc() -> Instrument {
        Instrument::new("BTC/USDT").unwrap()
    }

    fn buy(price: f64, stop: f64, take: f64) -> Result<Signal, DomainError> {
        Signal::new(
            btc(),
            OrderSide::Buy,
            price,
            take,
            stop,
            take,
            0.8,
            "5m",
            SignalMetadata::default(),
        )
    }

    #[test]
    fn test_id_format() {
        let signal = buy(100.0, 98.0, 105.0).unwrap();
        let parts: Vec<&str> = signal.id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "sig");
        assert_eq!(parts[1], signal.created_at.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_ids_are_unique() {
        let a = buy(100.0, 98.0, 105.0).unwrap();
        let b = buy(100.0, 98.0, 105.0).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_level_ordering_enforced() {
        assert!(buy(100.0, 101.0, 105.0).is_err());
        assert!(buy(100.0, 98.0, 99.0).is_err());
        let sell = Signal::new(
            btc(),
            OrderSide::Sell,
            100.0,
            95.0,
            102.0,
            95.0,
            0.7,
            "5m",
            SignalMetadata::default(),
        );
        assert!(sell.is_ok());
    }

    #[test]
    fn test_confidence_range() {
        let result = Signal::new(
            btc(),
            OrderSide::Buy,
            100.0,
            105.0,
            98.0,
            105.0,
            1.2,
            "5m",
            SignalMetadata::default(),
        );
        assert!(matches!(result, Err(DomainError::InvalidSignal(_))));
    }

    #[test]
    fn test_reward_risk_ratio() {
        let signal = buy(100.0, 98.0, 105.0).unwrap();
        assert_relative_eq!(signal.reward_risk_ratio(), 2.5);
        assert_relative_eq!(signal.stop_distance(), 2.0);
    }

    #[test]
    fn test_staleness_is_strict() {
        let now = Utc::now();
        let signal = buy(100.0, 98.0, 105.0)
            .unwrap()
            .with_created_at(now - Duration::seconds(300));
        assert!(!signal.is_stale(now, Duration::seconds(300)));
        assert!(signal.is_stale(now + Duration::seconds(1), Duration::seconds(300)));
    }
}
