//! Strategy framework: signal generator, strategy set, registry, manager

pub mod signal_generator;
pub mod strategy_kind;
pub mod strategy_manager;
pub mod strategy_registry;

pub use signal_generator::{protective_levels, SignalGenerator, GENERATOR_SOURCE};
pub use strategy_kind::StrategyKind;
pub use strategy_manager::{StrategyManager, StrategyRun};
pub use strategy_registry::StrategyRegistry;
