use std::fmt;

use serde::Serialize;

use quant_pilot_core::{TradingDomain, TradingMode};
use quant_pilot_risk::RiskState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Stopped,
    Running,
    Stopping,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Stopped => "stopped",
            EngineState::Running => "running",
            EngineState::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of the engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub state: EngineState,
    pub mode: TradingMode,
    pub domain: TradingDomain,
    pub market_open: bool,
    pub queued_signals: usize,
    pub open_positions: usize,
    pub cash: f64,
    pub equity: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub ticks_received: u64,
    pub risk: RiskState,
}

/// Counters from one scan cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub instruments: usize,
    pub generated: usize,
    pub queued: usize,
    pub rejected: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub skipped: bool,
}

/// Counters from one execution cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub executed: usize,
    pub expired: usize,
    pub zero_size: usize,
    pub failed: usize,
    pub protective_closes: usize,
    pub skipped: bool,
}

/// Outcome of the shutdown liquidation sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LiquidationReport {
    pub closed: usize,
    pub failed: usize,
    pub dropped_signals: usize,
}
