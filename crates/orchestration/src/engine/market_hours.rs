use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc, Weekday};

use quant_pilot_core::TradingDomain;

/// Regular US equity session in UTC: 14:30 to 21:00, Monday to Friday.
/// Crypto never closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketHours {
    domain: TradingDomain,
}

const OPEN_MINUTE: u32 = 14 * 60 + 30;
const CLOSE_MINUTE: u32 = 21 * 60;

impl MarketHours {
    pub fn new(domain: TradingDomain) -> Self {
        Self { domain }
    }

    pub fn is_open(&self, at: DateTime<Utc>) -> bool {
        match self.domain {
            TradingDomain::Crypto => true,
            TradingDomain::Equities => {
                if matches!(at.weekday(), Weekday::Sat | Weekday::Sun) {
                    return false;
                }
                let time: NaiveTime = at.time();
                let minute = time.hour() * 60 + time.minute();
                (OPEN_MINUTE..CLOSE_MINUTE).contains(&minute)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_equity_session() {
        let hours = MarketHours::new(TradingDomain::Equities);
        // 2024-03-06 is a Wednesday
        assert!(!hours.is_open(at(2024, 3, 6, 14, 29)));
        assert!(hours.is_open(at(2024, 3, 6, 14, 30)));
        assert!(hours.is_open(at(2024, 3, 6, 20, 59)));
        assert!(!hours.is_open(at(2024, 3, 6, 21, 0)));
        assert!(!hours.is_open(at(2024, 3, 9, 16, 0)));
    }

    #[test]
    fn test_crypto_always_open() {
        let hours = MarketHours::new(TradingDomain::Crypto);
        assert!(hours.is_open(at(2024, 3, 9, 3, 0)));
    }
}
