//! Kelly criterion: f = (p*b - q) / b

use quant_pilot_domain::Signal;

/// Multiplier applied to the raw fraction for gating
pub const KELLY_SAFETY_MULTIPLIER: f64 = 0.25;
/// Upper bound on the fraction used for sizing
pub const KELLY_CAP: f64 = 0.25;

/// Raw Kelly fraction for win probability `p` and payoff ratio `b`.
///
/// Undefined payoff (`b <= 0`) yields 0.
pub fn raw_kelly(p: f64, b: f64) -> f64 {
    if !(b.is_finite() && b > 0.0) {
        return 0.0;
    }
    let q = 1.0 - p;
    (p * b - q) / b
}

/// Safety-scaled fraction compared against the minimum; always in [0, 0.25]
pub fn gated_kelly(signal: &Signal) -> f64 {
    let raw = raw_kelly(signal.confidence, signal.reward_risk_ratio());
    (raw.max(0.0) * KELLY_SAFETY_MULTIPLIER).min(KELLY_CAP)
}

/// Fraction multiplied into the base size; always in [0, 0.25]
pub fn sizing_kelly(signal: &Signal) -> f64 {
    let raw = raw_kelly(signal.confidence, signal.reward_risk_ratio());
    raw.max(0.0).min(KELLY_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_raw_kelly() {
        assert_relative_eq!(raw_kelly(0.8, 2.5), 0.72);
        assert_relative_eq!(raw_kelly(0.5, 1.0), 0.0);
        assert!(raw_kelly(0.3, 1.0) < 0.0);
        assert_eq!(raw_kelly(0.9, 0.0), 0.0);
        assert_eq!(raw_kelly(0.9, f64::NAN), 0.0);
    }
}
