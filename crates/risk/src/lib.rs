//! # Quant Pilot Risk
//!
//! Risk gate: drawdown, exposure and correlation checks, Kelly sizing and
//! adaptive limits.

pub mod gate;
pub mod policies;
pub mod state;

pub use gate::{RejectReason, RiskAdjustment, RiskDecision, RiskGate};
pub use policies::{
    CorrelationPolicy, DrawdownAction, DrawdownPolicy, HeuristicCorrelation, PositionLimitPolicy,
};
pub use state::RiskState;
