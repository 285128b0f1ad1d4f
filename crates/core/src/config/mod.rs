//! Configuration: environment access, application settings, graceful shutdown

pub mod app_config;
pub mod environment;
pub mod shutdown_manager;

pub use app_config::{
    AppConfig, MarketDataSettings, PersistenceSettings, RiskSettings, ScheduleSettings,
    SignalSettings, TradingDomain, TradingMode, VenueSettings,
};
pub use environment::*;
pub use shutdown_manager::{ShutdownConfig, ShutdownManager};
