use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::OrderSide;
use crate::value_objects::{Instrument, Signal};

/// Executed entry order, the input to opening a position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: String,
    pub instrument: Instrument,
    pub side: OrderSide,
    pub price: f64,
    pub quantity: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub signal_id: Option<String>,
    pub filled_at: DateTime<Utc>,
}

impl Fill {
    /// Fill of `signal` at `price`; protective levels come from the signal
    pub fn from_signal(order_id: impl Into<String>, signal: &Signal, price: f64, quantity: f64) -> Self {
        Self {
            order_id: order_id.into(),
            instrument: signal.instrument.clone(),
            side: signal.action,
            price,
            quantity,
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
            signal_id: Some(signal.id.clone()),
            filled_at: Utc::now(),
        }
    }
}
