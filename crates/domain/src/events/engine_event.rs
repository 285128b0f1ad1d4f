use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{ClosedTrade, Position};
use crate::enums::OrderSide;
use crate::value_objects::{Instrument, Signal};

/// Notification published by the engine and the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    SignalGenerated(Signal),
    SignalRejected {
        signal_id: String,
        instrument: Instrument,
        reason: String,
    },
    SignalExpired {
        signal_id: String,
        instrument: Instrument,
        age_secs: i64,
    },
    OrderExecuted {
        order_id: String,
        signal_id: Option<String>,
        instrument: Instrument,
        side: OrderSide,
        quantity: f64,
        price: f64,
    },
    OrderFailed {
        signal_id: Option<String>,
        instrument: Instrument,
        reason: String,
    },
    PositionOpened(Position),
    PositionUpdated(Position),
    PositionClosed(ClosedTrade),
    TradeRecorded(ClosedTrade),
    RiskAdjusted {
        risk_per_trade: f64,
        max_open_positions: usize,
        reason: String,
    },
    Error {
        context: String,
        message: String,
        at: DateTime<Utc>,
    },
}

impl EngineEvent {
    pub fn error(context: impl Into<String>, message: impl ToString) -> Self {
        EngineEvent::Error {
            context: context.into(),
            message: message.to_string(),
            at: Utc::now(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::SignalGenerated(_) => "signal_generated",
            EngineEvent::SignalRejected { .. } => "signal_rejected",
            EngineEvent::SignalExpired { .. } => "signal_expired",
            EngineEvent::OrderExecuted { .. } => "order_executed",
            EngineEvent::OrderFailed { .. } => "order_failed",
            EngineEvent::PositionOpened(_) => "position_opened",
            EngineEvent::PositionUpdated(_) => "position_updated",
            EngineEvent::PositionClosed(_) => "position_closed",
            EngineEvent::TradeRecorded(_) => "trade_recorded",
            EngineEvent::RiskAdjusted { .. } => "risk_adjusted",
            EngineEvent::Error { .. } => "error",
        }
    }

    /// Events an external store persists
    pub fn is_persistable(&self) -> bool {
        matches!(
            self,
            EngineEvent::PositionOpened(_)
                | EngineEvent::PositionClosed(_)
                | EngineEvent::TradeRecorded(_)
        )
    }
}
