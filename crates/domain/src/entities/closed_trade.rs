use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{CloseReason, OrderSide};
use crate::value_objects::Instrument;

/// Record of a closed position; read-only once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub position_id: String,
    pub instrument: Instrument,
    pub side: OrderSide,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub realized_pnl: f64,
    pub reason: CloseReason,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

impl ClosedTrade {
    pub fn is_win(&self) -> bool {
        self.realized_pnl > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.realized_pnl < 0.0
    }

    /// Return on entry notional
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.quantity;
        if notional <= 0.0 {
            return 0.0;
        }
        self.realized_pnl / notional
    }
}
