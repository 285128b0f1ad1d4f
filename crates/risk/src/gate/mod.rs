mod decision;
pub mod kelly;
mod risk_gate;
pub mod sizing;

pub use decision::{RejectReason, RiskAdjustment, RiskDecision};
pub use kelly::{gated_kelly, raw_kelly, sizing_kelly, KELLY_CAP, KELLY_SAFETY_MULTIPLIER};
pub use risk_gate::RiskGate;
pub use sizing::volatility_multiplier;
