use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use quant_pilot_domain::{ClosedTrade, Position};

/// Serializable copy of the full ledger state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub account_currency: String,
    pub initial_cash: f64,
    pub balances: BTreeMap<String, f64>,
    /// Quote assets counted as cash in equity
    #[serde(default)]
    pub quote_assets: BTreeSet<String>,
    /// Ordered by position id
    pub positions: Vec<Position>,
    /// Oldest first
    pub trade_history: Vec<ClosedTrade>,
    pub realized_pnl: f64,
    /// Realized P&L of trades evicted from the bounded history
    #[serde(default)]
    pub evicted_pnl: f64,
}
