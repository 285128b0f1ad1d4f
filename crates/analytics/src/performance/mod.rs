//! Trade performance metrics: win rate, profit factor, Sharpe, drawdown, VaR

mod metrics;

pub use metrics::{
    calculate_performance_metrics, PerformanceCalculator, PerformanceMetrics, TRADING_DAYS_PER_YEAR,
    VAR_CONFIDENCE,
};
