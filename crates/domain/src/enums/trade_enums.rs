use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    StopLoss,
    TakeProfit,
    /// Explicit close request
    Manual,
    /// Forced close during engine shutdown
    Liquidation,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::StopLoss => "stop_loss",
            CloseReason::TakeProfit => "take_profit",
            CloseReason::Manual => "manual",
            CloseReason::Liquidation => "liquidation",
        }
    }

    pub fn is_protective(&self) -> bool {
        matches!(self, CloseReason::StopLoss | CloseReason::TakeProfit)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
