//! Risk-based position sizing

use quant_pilot_core::RiskSettings;
use quant_pilot_domain::Signal;

use super::kelly::sizing_kelly;
use crate::policies::PositionLimitPolicy;
use crate::state::RiskState;

/// De-risking multiplier by volatility tier
pub fn volatility_multiplier(volatility: f64) -> f64 {
    if volatility > 0.3 {
        0.5
    } else if volatility > 0.2 {
        0.7
    } else if volatility > 0.1 {
        0.9
    } else {
        1.0
    }
}

fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

fn floor_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).floor() / factor
}

/// Quantity to trade for `signal`, 0 meaning "do not trade".
///
/// risk amount / stop distance, scaled by the capped Kelly fraction and the
/// volatility tier, capped at the notional limit, dropped below the minimum
/// trade value and rounded to `quantity_precision` decimals.
pub fn size_position(
    signal: &Signal,
    state: &RiskState,
    account_balance: f64,
    settings: &RiskSettings,
) -> f64 {
    if !(account_balance.is_finite() && account_balance > 0.0) {
        return 0.0;
    }
    let stop_distance = signal.stop_distance();
    if stop_distance <= f64::EPSILON {
        return 0.0;
    }

    let risk_amount = account_balance * state.risk_per_trade;
    let base_size = risk_amount / stop_distance;
    let mut quantity =
        base_size * sizing_kelly(signal) * volatility_multiplier(signal.metadata.volatility);

    let limits = PositionLimitPolicy {
        max_open_positions: state.max_open_positions,
        max_position_size: state.max_position_size,
    };
    let max_quantity = limits.max_quantity(signal.price);
    quantity = quantity.min(max_quantity);

    let mut rounded = round_to(quantity, settings.quantity_precision);
    if rounded > max_quantity {
        rounded = floor_to(quantity, settings.quantity_precision);
    }
    if rounded <= 0.0 || rounded * signal.price < settings.min_trade_value {
        return 0.0;
    }
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers() {
        assert_eq!(volatility_multiplier(0.05), 1.0);
        assert_eq!(volatility_multiplier(0.1), 1.0);
        assert_eq!(volatility_multiplier(0.15), 0.9);
        assert_eq!(volatility_multiplier(0.25), 0.7);
        assert_eq!(volatility_multiplier(0.45), 0.5);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_to(25.126, 2), 25.13);
        assert_eq!(floor_to(25.129, 2), 25.12);
    }
}
