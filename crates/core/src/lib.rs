//! # Quant Pilot Core
//!
//! Core infrastructure: configuration, logging, error taxonomy, graceful shutdown.

pub mod config;
pub mod error;
pub mod logger;

pub use config::{
    AppConfig, MarketDataSettings, PersistenceSettings, RiskSettings, ScheduleSettings,
    SignalSettings, TradingDomain, TradingMode, VenueSettings,
};
pub use error::{AppError, AppResult};
