use std::fmt;

use serde::Serialize;

use quant_pilot_domain::Instrument;

/// Why the gate turned a signal down, in check order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum RejectReason {
    DrawdownExceeded { current: f64, max: f64 },
    TooManyPositions { open: usize, max: usize },
    CorrelationTooHigh { with: Instrument, correlation: f64, max: f64 },
    LowConfidence { confidence: f64, min: f64 },
    HighVolatility { volatility: f64, max: f64 },
    KellyTooSmall { kelly: f64, min: f64 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::DrawdownExceeded { current, max } => write!(
                f,
                "drawdown {:.2}% above limit {:.2}%",
                current * 100.0,
                max * 100.0
            ),
            RejectReason::TooManyPositions { open, max } => {
                write!(f, "{} open positions, limit {}", open, max)
            }
            RejectReason::CorrelationTooHigh {
                with,
                correlation,
                max,
            } => write!(
                f,
                "correlation {:.2} with {} above {:.2}",
                correlation, with, max
            ),
            RejectReason::LowConfidence { confidence, min } => {
                write!(f, "confidence {:.3} below {:.3}", confidence, min)
            }
            RejectReason::HighVolatility { volatility, max } => {
                write!(f, "volatility {:.4} above {:.4}", volatility, max)
            }
            RejectReason::KellyTooSmall { kelly, min } => {
                write!(f, "kelly fraction {:.4} below {:.4}", kelly, min)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RiskDecision {
    Approved,
    Rejected(RejectReason),
}

impl RiskDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, RiskDecision::Approved)
    }

    pub fn reason(&self) -> Option<&RejectReason> {
        match self {
            RiskDecision::Approved => None,
            RiskDecision::Rejected(reason) => Some(reason),
        }
    }
}

/// Limits after an adaptive adjustment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAdjustment {
    pub risk_per_trade: f64,
    pub max_open_positions: usize,
    pub reason: String,
}
