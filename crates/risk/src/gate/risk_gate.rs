use std::sync::Arc;

use tracing::{debug, info, warn};

use quant_pilot_analytics::PerformanceMetrics;
use quant_pilot_core::RiskSettings;
use quant_pilot_domain::{Instrument, Position, Signal};

use super::decision::{RejectReason, RiskAdjustment, RiskDecision};
use super::kelly::gated_kelly;
use super::sizing;
use crate::policies::{CorrelationPolicy, DrawdownPolicy, HeuristicCorrelation, PositionLimitPolicy};
use crate::state::RiskState;

pub const MIN_RISK_PER_TRADE: f64 = 0.0025;
pub const MAX_RISK_PER_TRADE: f64 = 0.03;
pub const MIN_OPEN_POSITIONS: usize = 3;
pub const MAX_OPEN_POSITIONS: usize = 15;
/// Win rate and profit factor above which limits are loosened
pub const STRONG_WIN_RATE: f64 = 0.6;
pub const STRONG_PROFIT_FACTOR: f64 = 2.0;

/// Validates signals and sizes positions.
///
/// Static thresholds come from [`RiskSettings`]; the limits that adapt over
/// time (risk per trade, open position cap, drawdown) live in [`RiskState`].
pub struct RiskGate {
    settings: RiskSettings,
    correlation: Arc<dyn CorrelationPolicy>,
}

impl RiskGate {
    pub fn new(settings: RiskSettings) -> Self {
        Self {
            settings,
            correlation: Arc::new(HeuristicCorrelation::default()),
        }
    }

    pub fn with_correlation_policy(mut self, policy: Arc<dyn CorrelationPolicy>) -> Self {
        self.correlation = policy;
        self
    }

    pub fn settings(&self) -> &RiskSettings {
        &self.settings
    }

    pub fn new_state(&self, initial_balance: f64) -> RiskState {
        RiskState::new(initial_balance, &self.settings)
    }

    /// Runs the checks in order and stops at the first failure
    pub fn validate(
        &self,
        signal: &Signal,
        state: &mut RiskState,
        open_positions: &[Position],
    ) -> RiskDecision {
        let decision = self.check(signal, state, open_positions);
        match &decision {
            RiskDecision::Approved => debug!("{} {} approved", signal.id, signal.instrument),
            RiskDecision::Rejected(reason) => {
                info!("{} {} rejected: {}", signal.id, signal.instrument, reason)
            }
        }
        decision
    }

    fn check(
        &self,
        signal: &Signal,
        state: &mut RiskState,
        open_positions: &[Position],
    ) -> RiskDecision {
        let drawdown = DrawdownPolicy::new(state.max_drawdown);
        if drawdown.is_drawdown_exceeded(state.current_drawdown) {
            return RiskDecision::Rejected(RejectReason::DrawdownExceeded {
                current: state.current_drawdown,
                max: state.max_drawdown,
            });
        }

        let limits = PositionLimitPolicy {
            max_open_positions: state.max_open_positions,
            max_position_size: state.max_position_size,
        };
        if limits.can_open_position(open_positions.len()).is_err() {
            return RiskDecision::Rejected(RejectReason::TooManyPositions {
                open: open_positions.len(),
                max: state.max_open_positions,
            });
        }

        if let Some((with, correlation)) =
            self.correlation_risk(&signal.instrument, open_positions, state)
        {
            if correlation > self.settings.max_correlation {
                return RiskDecision::Rejected(RejectReason::CorrelationTooHigh {
                    with,
                    correlation,
                    max: self.settings.max_correlation,
                });
            }
        }

        if signal.confidence < self.settings.min_confidence {
            return RiskDecision::Rejected(RejectReason::LowConfidence {
                confidence: signal.confidence,
                min: self.settings.min_confidence,
            });
        }

        if signal.metadata.volatility > self.settings.max_volatility {
            return RiskDecision::Rejected(RejectReason::HighVolatility {
                volatility: signal.metadata.volatility,
                max: self.settings.max_volatility,
            });
        }

        let kelly = gated_kelly(signal);
        if kelly < self.settings.min_kelly_fraction {
            return RiskDecision::Rejected(RejectReason::KellyTooSmall {
                kelly,
                min: self.settings.min_kelly_fraction,
            });
        }

        RiskDecision::Approved
    }

    /// Highest correlation between `instrument` and any open position, with
    /// the instrument it was measured against. Coefficients are memoized.
    pub fn correlation_risk(
        &self,
        instrument: &Instrument,
        open_positions: &[Position],
        state: &mut RiskState,
    ) -> Option<(Instrument, f64)> {
        let mut highest: Option<(Instrument, f64)> = None;
        for position in open_positions {
            let value = match state.cached_correlation(instrument, &position.instrument) {
                Some(value) => value,
                None => {
                    let value = self.correlation.correlation(instrument, &position.instrument);
                    state.remember_correlation(instrument, &position.instrument, value);
                    value
                }
            };
            if highest.as_ref().map_or(true, |(_, best)| value > *best) {
                highest = Some((position.instrument.clone(), value));
            }
        }
        highest
    }

    pub fn size_position(&self, signal: &Signal, state: &RiskState, account_balance: f64) -> f64 {
        sizing::size_position(signal, state, account_balance, &self.settings)
    }

    /// Tightens limits in drawdown and loosens them after strong results.
    ///
    /// Returns the new limits when anything changed.
    pub fn adapt(
        &self,
        state: &mut RiskState,
        metrics: &PerformanceMetrics,
    ) -> Option<RiskAdjustment> {
        let before = (state.risk_per_trade, state.max_open_positions);
        let drawdown = DrawdownPolicy::new(state.max_drawdown);

        let mut reasons = Vec::new();
        if drawdown.is_warning_level(state.current_drawdown) {
            state.risk_per_trade = (state.risk_per_trade * 0.5).max(MIN_RISK_PER_TRADE);
            if state.max_open_positions > MIN_OPEN_POSITIONS {
                state.max_open_positions -= 1;
            }
            reasons.push(format!(
                "drawdown {:.2}% above half of limit {:.2}%",
                state.current_drawdown * 100.0,
                state.max_drawdown * 100.0
            ));
        }
        // independent of the drawdown rule
        if metrics.win_rate > STRONG_WIN_RATE && metrics.profit_factor > STRONG_PROFIT_FACTOR {
            state.risk_per_trade = (state.risk_per_trade * 1.1).min(MAX_RISK_PER_TRADE);
            if state.max_open_positions < MAX_OPEN_POSITIONS {
                state.max_open_positions += 1;
            }
            reasons.push(format!(
                "win rate {:.2}, profit factor {:.2}",
                metrics.win_rate, metrics.profit_factor
            ));
        }
        if reasons.is_empty() {
            return None;
        }
        let reason = reasons.join("; ");

        if (state.risk_per_trade, state.max_open_positions) == before {
            return None;
        }
        warn!(
            "risk limits adjusted ({}): risk per trade {:.4} -> {:.4}, max open {} -> {}",
            reason, before.0, state.risk_per_trade, before.1, state.max_open_positions
        );
        Some(RiskAdjustment {
            risk_per_trade: state.risk_per_trade,
            max_open_positions: state.max_open_positions,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gate() -> RiskGate {
        RiskGate::new(RiskSettings::default())
    }

    fn strong_metrics() -> PerformanceMetrics {
        PerformanceMetrics {
            win_rate: 0.7,
            profit_factor: 3.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_adapt_in_drawdown() {
        let gate = gate();
        let mut state = gate.new_state(10_000.0);
        state.update_balance(8_900.0);

        let adjustment = gate.adapt(&mut state, &PerformanceMetrics::default()).unwrap();
        assert_relative_eq!(adjustment.risk_per_trade, 0.01);
        assert_eq!(adjustment.max_open_positions, 9);
    }

    #[test]
    fn test_adapt_in_drawdown_with_strong_record_applies_both_rules() {
        let gate = gate();
        let mut state = gate.new_state(10_000.0);
        state.update_balance(8_900.0);

        let adjustment = gate.adapt(&mut state, &strong_metrics()).unwrap();
        // halved to 1%, then raised by 10%
        assert_relative_eq!(adjustment.risk_per_trade, 0.011, epsilon = 1e-12);
        assert_eq!(adjustment.max_open_positions, 10);
        assert!(adjustment.reason.contains("drawdown"));
        assert!(adjustment.reason.contains("win rate"));
    }

    #[test]
    fn test_adapt_floors() {
        let gate = gate();
        let mut state = gate.new_state(10_000.0);
        state.update_balance(8_000.0);
        for _ in 0..20 {
            gate.adapt(&mut state, &PerformanceMetrics::default());
        }
        assert_relative_eq!(state.risk_per_trade, MIN_RISK_PER_TRADE);
        assert_eq!(state.max_open_positions, MIN_OPEN_POSITIONS);
        assert!(gate.adapt(&mut state, &PerformanceMetrics::default()).is_none());
    }

    #[test]
    fn test_adapt_on_strong_performance_caps() {
        let gate = gate();
        let mut state = gate.new_state(10_000.0);

        let adjustment = gate.adapt(&mut state, &strong_metrics()).unwrap();
        assert_relative_eq!(adjustment.risk_per_trade, 0.022);
        assert_eq!(adjustment.max_open_positions, 11);

        for _ in 0..20 {
            gate.adapt(&mut state, &strong_metrics());
        }
        assert_relative_eq!(state.risk_per_trade, MAX_RISK_PER_TRADE);
        assert_eq!(state.max_open_positions, MAX_OPEN_POSITIONS);
    }

    #[test]
    fn test_adapt_no_change_on_average_results() {
        let gate = gate();
        let mut state = gate.new_state(10_000.0);
        let metrics = PerformanceMetrics {
            win_rate: 0.55,
            profit_factor: 3.0,
            ..Default::default()
        };
        assert!(gate.adapt(&mut state, &metrics).is_none());
        assert_relative_eq!(state.risk_per_trade, 0.02);
    }
}
