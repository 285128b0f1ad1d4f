//! # Quant Pilot Strategies
//!
//! Signal generation: the forecast-driven generator, the rule-based
//! strategies, the name-keyed registry and the manager that runs them, plus a
//! built-in trend predictor.

pub mod error;
pub mod framework;
pub mod implementations;
pub mod predictor;

pub use error::StrategyError;
pub use framework::{
    protective_levels, SignalGenerator, StrategyKind, StrategyManager, StrategyRegistry,
    StrategyRun,
};
pub use predictor::TrendPredictor;
