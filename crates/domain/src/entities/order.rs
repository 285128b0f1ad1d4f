//! Typed venue requests and results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{OrderSide, OrderStatus, OrderType};
use crate::value_objects::Instrument;

/// Top of book plus last trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub instrument: Instrument,
    pub price: f64,
    pub volume: f64,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub instrument: Instrument,
    pub order_type: OrderType,
    pub side: OrderSide,
    pub quantity: f64,
    /// Limit / trigger price; `None` for market orders
    pub price: Option<f64>,
}

impl OrderRequest {
    pub fn market(instrument: Instrument, side: OrderSide, quantity: f64) -> Self {
        Self {
            instrument,
            order_type: OrderType::Market,
            side,
            quantity,
            price: None,
        }
    }

    pub fn stop_loss(instrument: Instrument, side: OrderSide, quantity: f64, trigger: f64) -> Self {
        Self {
            instrument,
            order_type: OrderType::StopLoss,
            side,
            quantity,
            price: Some(trigger),
        }
    }

    pub fn take_profit(instrument: Instrument, side: OrderSide, quantity: f64, limit: f64) -> Self {
        Self {
            instrument,
            order_type: OrderType::TakeProfit,
            side,
            quantity,
            price: Some(limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub id: String,
    pub status: OrderStatus,
    pub filled_price: Option<f64>,
    pub filled_quantity: f64,
}

impl OrderResult {
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled && self.filled_price.is_some()
    }
}

/// Position as reported by the venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenuePosition {
    pub instrument: Instrument,
    pub side: OrderSide,
    pub quantity: f64,
    pub average_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub cash: f64,
    pub buying_power: f64,
    pub positions: Vec<VenuePosition>,
}
