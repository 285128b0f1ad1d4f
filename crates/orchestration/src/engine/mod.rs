mod market_hours;
mod status;
mod trading_engine;

pub use market_hours::MarketHours;
pub use status::{EngineState, EngineStatus, ExecutionReport, LiquidationReport, ScanReport};
pub use trading_engine::TradingEngine;
