//! Application configuration
//!
//! Every option has a default, is overridable through the environment (a `.env`
//! file is loaded first by the binary) and is validated once at startup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::environment::{env_f64, env_is_true, env_list, env_opt, env_or_default, env_u64, env_usize};
use crate::error::{AppError, AppResult};

/// Paper trading simulates fills locally; live trading talks to a real venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Paper,
    Live,
}

impl FromStr for TradingMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "paper" => Ok(TradingMode::Paper),
            "live" => Ok(TradingMode::Live),
            other => Err(AppError::Config(format!(
                "unknown trading mode '{}', expected paper|live",
                other
            ))),
        }
    }
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingMode::Paper => write!(f, "paper"),
            TradingMode::Live => write!(f, "live"),
        }
    }
}

/// Crypto trades around the clock, equities only inside market hours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingDomain {
    Crypto,
    Equities,
}

impl FromStr for TradingDomain {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "crypto" => Ok(TradingDomain::Crypto),
            "equities" | "equity" | "stocks" => Ok(TradingDomain::Equities),
            other => Err(AppError::Config(format!(
                "unknown trading domain '{}', expected crypto|equities",
                other
            ))),
        }
    }
}

impl fmt::Display for TradingDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingDomain::Crypto => write!(f, "crypto"),
            TradingDomain::Equities => write!(f, "equities"),
        }
    }
}

/// Risk gate thresholds and sizing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSettings {
    /// Notional cap for one position, in account currency
    pub max_position_size: f64,
    /// Fraction of peak balance (0.2 = 20%)
    pub max_drawdown: f64,
    /// Fraction of balance risked per trade
    pub risk_per_trade: f64,
    pub max_open_positions: usize,
    pub min_confidence: f64,
    pub max_volatility: f64,
    pub min_kelly_fraction: f64,
    /// Correlation strictly above this rejects the signal
    pub max_correlation: f64,
    /// Smallest notional worth trading; anything below sizes to zero
    pub min_trade_value: f64,
    /// Decimal places the position quantity is rounded to
    pub quantity_precision: u32,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            max_position_size: 10_000.0,
            max_drawdown: 0.20,
            risk_per_trade: 0.02,
            max_open_positions: 10,
            min_confidence: 0.65,
            max_volatility: 0.5,
            min_kelly_fraction: 0.01,
            max_correlation: 0.8,
            min_trade_value: 10.0,
            quantity_precision: 2,
        }
    }
}

/// Signal generator thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSettings {
    /// Forecast confidence must exceed this
    pub confidence_threshold: f64,
    /// Minimum absolute predicted move, as a fraction (0.01 = 1%)
    pub min_price_change: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub timeframe: String,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.65,
            min_price_change: 0.01,
            stop_loss_pct: 0.02,
            take_profit_pct: 0.05,
            timeframe: "5m".to_string(),
        }
    }
}

/// Cycle cadences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    pub scan_interval_secs: u64,
    pub execution_interval_secs: u64,
    pub performance_interval_secs: u64,
    /// Queued signals older than this are discarded
    pub signal_max_age_secs: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            scan_interval_secs: 300,
            execution_interval_secs: 60,
            performance_interval_secs: 900,
            signal_max_age_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataSettings {
    /// Upper bound on candles kept per instrument
    pub candle_window: usize,
    /// Candles requested from the venue per scan
    pub candle_fetch_count: usize,
    pub ticker_ws_url: Option<String>,
    pub stream_reconnect_secs: u64,
}

impl Default for MarketDataSettings {
    fn default() -> Self {
        Self {
            candle_window: 500,
            candle_fetch_count: 100,
            ticker_ws_url: None,
            stream_reconnect_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueSettings {
    pub name: String,
    pub api_key: Option<String>,
    #[serde(skip_serializing)]
    pub api_secret: Option<String>,
    pub paper_slippage_bps: f64,
    pub place_protective_orders: bool,
}

impl VenueSettings {
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }
}

impl Default for VenueSettings {
    fn default() -> Self {
        Self {
            name: "paper".to_string(),
            api_key: None,
            api_secret: None,
            paper_slippage_bps: 5.0,
            place_protective_orders: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceSettings {
    /// JSON-lines trade log; `None` disables persistence
    pub trade_log_path: Option<String>,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            trade_log_path: Some("data/trades.jsonl".to_string()),
        }
    }
}

/// Resolved application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub mode: TradingMode,
    pub domain: TradingDomain,
    pub instruments: Vec<String>,
    pub account_currency: String,
    pub initial_balance: f64,
    pub strategies: Vec<String>,
    pub risk: RiskSettings,
    pub signal: SignalSettings,
    pub schedule: ScheduleSettings,
    pub market_data: MarketDataSettings,
    pub venue: VenueSettings,
    pub persistence: PersistenceSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: TradingMode::Paper,
            domain: TradingDomain::Crypto,
            instruments: vec![
                "BTC/USDT".to_string(),
                "ETH/USDT".to_string(),
                "SOL/USDT".to_string(),
            ],
            account_currency: "USDT".to_string(),
            initial_balance: 10_000.0,
            strategies: vec!["predictor_ensemble".to_string()],
            risk: RiskSettings::default(),
            signal: SignalSettings::default(),
            schedule: ScheduleSettings::default(),
            market_data: MarketDataSettings::default(),
            venue: VenueSettings::default(),
            persistence: PersistenceSettings::default(),
        }
    }
}

impl AppConfig {
    /// Builds the configuration from the process environment
    pub fn from_env() -> AppResult<Self> {
        let defaults = AppConfig::default();

        let mode = match env_opt("TRADING_MODE") {
            Some(raw) => raw.parse()?,
            None => defaults.mode,
        };
        let domain = match env_opt("TRADING_DOMAIN") {
            Some(raw) => raw.parse()?,
            None => defaults.domain,
        };
        let default_instruments: Vec<&str> =
            defaults.instruments.iter().map(|s| s.as_str()).collect();
        let default_strategies: Vec<&str> =
            defaults.strategies.iter().map(|s| s.as_str()).collect();

        let risk_defaults = RiskSettings::default();
        let risk = RiskSettings {
            max_position_size: env_f64("RISK_MAX_POSITION_SIZE", risk_defaults.max_position_size)?,
            max_drawdown: env_f64("RISK_MAX_DRAWDOWN", risk_defaults.max_drawdown)?,
            risk_per_trade: env_f64("RISK_PER_TRADE", risk_defaults.risk_per_trade)?,
            max_open_positions: env_usize(
                "RISK_MAX_OPEN_POSITIONS",
                risk_defaults.max_open_positions,
            )?,
            min_confidence: env_f64("RISK_MIN_CONFIDENCE", risk_defaults.min_confidence)?,
            max_volatility: env_f64("RISK_MAX_VOLATILITY", risk_defaults.max_volatility)?,
            min_kelly_fraction: env_f64("RISK_MIN_KELLY", risk_defaults.min_kelly_fraction)?,
            max_correlation: env_f64("RISK_MAX_CORRELATION", risk_defaults.max_correlation)?,
            min_trade_value: env_f64("RISK_MIN_TRADE_VALUE", risk_defaults.min_trade_value)?,
            quantity_precision: env_u64(
                "RISK_QUANTITY_PRECISION",
                risk_defaults.quantity_precision as u64,
            )? as u32,
        };

        let signal_defaults = SignalSettings::default();
        let signal = SignalSettings {
            confidence_threshold: env_f64(
                "SIGNAL_CONFIDENCE_THRESHOLD",
                signal_defaults.confidence_threshold,
            )?,
            min_price_change: env_f64("SIGNAL_MIN_PRICE_CHANGE", signal_defaults.min_price_change)?,
            stop_loss_pct: env_f64("SIGNAL_STOP_LOSS_PCT", signal_defaults.stop_loss_pct)?,
            take_profit_pct: env_f64("SIGNAL_TAKE_PROFIT_PCT", signal_defaults.take_profit_pct)?,
            timeframe: env_or_default("SIGNAL_TIMEFRAME", &signal_defaults.timeframe),
        };

        let schedule_defaults = ScheduleSettings::default();
        let schedule = ScheduleSettings {
            scan_interval_secs: env_u64("SCAN_INTERVAL_SECS", schedule_defaults.scan_interval_secs)?,
            execution_interval_secs: env_u64(
                "EXECUTION_INTERVAL_SECS",
                schedule_defaults.execution_interval_secs,
            )?,
            performance_interval_secs: env_u64(
                "PERFORMANCE_INTERVAL_SECS",
                schedule_defaults.performance_interval_secs,
            )?,
            signal_max_age_secs: env_u64(
                "SIGNAL_MAX_AGE_SECS",
                schedule_defaults.signal_max_age_secs,
            )?,
        };

        let market_defaults = MarketDataSettings::default();
        let market_data = MarketDataSettings {
            candle_window: env_usize("CANDLE_WINDOW", market_defaults.candle_window)?,
            candle_fetch_count: env_usize("CANDLE_FETCH_COUNT", market_defaults.candle_fetch_count)?,
            ticker_ws_url: env_opt("TICKER_WS_URL"),
            stream_reconnect_secs: env_u64(
                "STREAM_RECONNECT_SECS",
                market_defaults.stream_reconnect_secs,
            )?,
        };

        let venue_defaults = VenueSettings::default();
        let venue = VenueSettings {
            name: env_or_default("VENUE_NAME", &venue_defaults.name),
            api_key: env_opt("VENUE_API_KEY"),
            api_secret: env_opt("VENUE_API_SECRET"),
            paper_slippage_bps: env_f64("PAPER_SLIPPAGE_BPS", venue_defaults.paper_slippage_bps)?,
            place_protective_orders: env_is_true(
                "PLACE_PROTECTIVE_ORDERS",
                venue_defaults.place_protective_orders,
            ),
        };

        let persistence = PersistenceSettings {
            trade_log_path: match env_opt("TRADE_LOG_PATH") {
                Some(path) if path.eq_ignore_ascii_case("none") => None,
                Some(path) => Some(path),
                None => defaults.persistence.trade_log_path.clone(),
            },
        };

        let config = AppConfig {
            mode,
            domain,
            instruments: env_list("INSTRUMENTS", &default_instruments),
            account_currency: env_or_default("ACCOUNT_CURRENCY", &defaults.account_currency),
            initial_balance: env_f64("INITIAL_BALANCE", defaults.initial_balance)?,
            strategies: env_list("STRATEGIES", &default_strategies),
            risk,
            signal,
            schedule,
            market_data,
            venue,
            persistence,
        };
        Ok(config)
    }

    /// Rejects configurations the engine must not start with
    pub fn validate(&self) -> AppResult<()> {
        fn fraction(name: &str, value: f64) -> AppResult<()> {
            if !(value > 0.0 && value <= 1.0) {
                return Err(AppError::Config(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
            Ok(())
        }

        if self.instruments.is_empty() {
            return Err(AppError::Config("no instruments configured".to_string()));
        }
        if self.strategies.is_empty() {
            return Err(AppError::Config("no strategies configured".to_string()));
        }
        if self.initial_balance <= 0.0 {
            return Err(AppError::Config(format!(
                "initial balance must be positive, got {}",
                self.initial_balance
            )));
        }

        fraction("RISK_MAX_DRAWDOWN", self.risk.max_drawdown)?;
        fraction("RISK_PER_TRADE", self.risk.risk_per_trade)?;
        fraction("RISK_MIN_CONFIDENCE", self.risk.min_confidence)?;
        fraction("RISK_MAX_CORRELATION", self.risk.max_correlation)?;
        fraction("SIGNAL_CONFIDENCE_THRESHOLD", self.signal.confidence_threshold)?;
        fraction("SIGNAL_STOP_LOSS_PCT", self.signal.stop_loss_pct)?;
        fraction("SIGNAL_TAKE_PROFIT_PCT", self.signal.take_profit_pct)?;
        if self.risk.max_position_size <= 0.0 {
            return Err(AppError::Config(
                "RISK_MAX_POSITION_SIZE must be positive".to_string(),
            ));
        }
        if self.risk.max_open_positions == 0 {
            return Err(AppError::Config(
                "RISK_MAX_OPEN_POSITIONS must be at least 1".to_string(),
            ));
        }
        if self.signal.min_price_change < 0.0 {
            return Err(AppError::Config(
                "SIGNAL_MIN_PRICE_CHANGE must not be negative".to_string(),
            ));
        }
        if self.schedule.scan_interval_secs == 0 || self.schedule.execution_interval_secs == 0 {
            return Err(AppError::Config(
                "cycle intervals must be at least one second".to_string(),
            ));
        }
        if self.market_data.candle_window == 0 {
            return Err(AppError::Config("CANDLE_WINDOW must be positive".to_string()));
        }

        if self.mode == TradingMode::Live && !self.venue.has_credentials() {
            return Err(AppError::Config(
                "live trading requires VENUE_API_KEY and VENUE_API_SECRET".to_string(),
            ));
        }
        Ok(())
    }
}
