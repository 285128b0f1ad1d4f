//! Position count and notional limits

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionLimitPolicy {
    pub max_open_positions: usize,
    /// Notional cap per position
    pub max_position_size: f64,
}

impl PositionLimitPolicy {
    pub fn can_open_position(&self, open_positions: usize) -> Result<(), String> {
        if open_positions >= self.max_open_positions {
            return Err(format!(
                "{} open positions, limit {}",
                open_positions, self.max_open_positions
            ));
        }
        Ok(())
    }

    /// Largest quantity whose notional stays within the cap
    pub fn max_quantity(&self, price: f64) -> f64 {
        if price <= 0.0 {
            return 0.0;
        }
        self.max_position_size / price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits() {
        let policy = PositionLimitPolicy {
            max_open_positions: 2,
            max_position_size: 10_000.0,
        };
        assert!(policy.can_open_position(1).is_ok());
        assert!(policy.can_open_position(2).is_err());
        assert_eq!(policy.max_quantity(100.0), 100.0);
        assert_eq!(policy.max_quantity(0.0), 0.0);
    }
}
