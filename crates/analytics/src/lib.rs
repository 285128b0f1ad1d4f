//! # Quant Pilot Analytics
//!
//! Performance metrics derived from closed-trade history.

pub mod performance;

pub use performance::{calculate_performance_metrics, PerformanceCalculator, PerformanceMetrics};
