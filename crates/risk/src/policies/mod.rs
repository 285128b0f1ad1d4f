//! Risk policies

pub mod correlation_policy;
pub mod drawdown_policy;
pub mod position_limit_policy;

pub use correlation_policy::{CorrelationPolicy, HeuristicCorrelation};
pub use drawdown_policy::{DrawdownAction, DrawdownPolicy};
pub use position_limit_policy::PositionLimitPolicy;
