//! OHLCV candle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open time
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, DomainError> {
        let candle = Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        };
        candle.validate()?;
        Ok(candle)
    }

    /// High/low must bracket open and close; prices positive, volume non-negative
    pub fn validate(&self) -> Result<(), DomainError> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(DomainError::InvalidCandle(format!(
                "non-positive price at {}",
                self.timestamp
            )));
        }
        if self.high < self.open.max(self.close) || self.low > self.open.min(self.close) {
            return Err(DomainError::InvalidCandle(format!(
                "high/low do not bracket open/close at {}",
                self.timestamp
            )));
        }
        if self.volume < 0.0 {
            return Err(DomainError::InvalidCandle(format!(
                "negative volume at {}",
                self.timestamp
            )));
        }
        Ok(())
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_validation() {
        let now = Utc::now();
        assert!(Candle::new(now, 100.0, 105.0, 99.0, 104.0, 10.0).unwrap().is_bullish());
        assert!(Candle::new(now, 100.0, 101.0, 99.0, 102.0, 10.0).is_err());
        assert!(Candle::new(now, 0.0, 101.0, 99.0, 100.0, 10.0).is_err());
        assert!(Candle::new(now, 100.0, 101.0, 99.0, 100.0, -1.0).is_err());
    }
}
