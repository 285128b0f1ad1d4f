//! # Quant Pilot Orchestration
//!
//! The trading engine and what runs around it: the periodic task scheduler,
//! event logging and asynchronous trade persistence.

pub mod engine;
pub mod events;
pub mod persistence;
pub mod scheduler;

pub use engine::{
    EngineState, EngineStatus, ExecutionReport, LiquidationReport, MarketHours, ScanReport,
    TradingEngine,
};
pub use events::spawn_event_logger;
pub use persistence::{spawn_trade_store_worker, JsonlTradeStore, TradeStore};
pub use scheduler::TaskScheduler;
