//! Open position

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Fill;
use crate::enums::{CloseReason, OrderSide};
use crate::value_objects::Instrument;

/// Open position, owned by the portfolio ledger.
///
/// `quantity` is always positive and `side` never changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub instrument: Instrument,
    pub side: OrderSide,
    pub entry_price: f64,
    pub quantity: f64,
    pub current_price: f64,
    pub unrealized_pnl: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub signal_id: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// Builds a position from a fill. The caller validates the fill.
    pub fn from_fill(id: impl Into<String>, fill: &Fill) -> Self {
        Self {
            id: id.into(),
            instrument: fill.instrument.clone(),
            side: fill.side,
            entry_price: fill.price,
            quantity: fill.quantity,
            current_price: fill.price,
            unrealized_pnl: 0.0,
            stop_loss: fill.stop_loss,
            take_profit: fill.take_profit,
            signal_id: fill.signal_id.clone(),
            opened_at: fill.filled_at,
            updated_at: fill.filled_at,
        }
    }

    /// `(price - entry) * qty`, negated for SELL
    pub fn pnl_at(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.quantity * self.side.sign()
    }

    pub fn update_price(&mut self, price: f64, at: DateTime<Utc>) {
        self.current_price = price;
        self.unrealized_pnl = self.pnl_at(price);
        self.updated_at = at;
    }

    /// Protective exit triggered at `price`, if any.
    ///
    /// BUY: stop when price <= stop_loss, target when price >= take_profit.
    /// SELL mirrors both.
    pub fn exit_trigger(&self, price: f64) -> Option<CloseReason> {
        match self.side {
            OrderSide::Buy => {
                if price <= self.stop_loss {
                    Some(CloseReason::StopLoss)
                } else if price >= self.take_profit {
                    Some(CloseReason::TakeProfit)
                } else {
                    None
                }
            }
            OrderSide::Sell => {
                if price >= self.stop_loss {
                    Some(CloseReason::StopLoss)
                } else if price <= self.take_profit {
                    Some(CloseReason::TakeProfit)
                } else {
                    None
                }
            }
        }
    }

    /// Entry notional
    pub fn notional(&self) -> f64 {
        self.entry_price * self.quantity
    }

    /// Signed mark-to-market value of the base asset held
    pub fn market_value(&self) -> f64 {
        self.current_price * self.quantity * self.side.sign()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn position(side: OrderSide, stop: f64, take: f64) -> Position {
        let fill = Fill {
            order_id: "ord-1".to_string(),
            instrument: Instrument::new("BTC/USDT").unwrap(),
            side,
            price: 100.0,
            quantity: 2.0,
            stop_loss: stop,
            take_profit: take,
            signal_id: None,
            filled_at: Utc::now(),
        };
        Position::from_fill("pos-1", &fill)
    }

    #[test]
    fn test_pnl_by_side() {
        let mut long = position(OrderSide::Buy, 98.0, 105.0);
        long.update_price(103.0, Utc::now());
        assert_relative_eq!(long.unrealized_pnl, 6.0);

        let mut short = position(OrderSide::Sell, 102.0, 95.0);
        short.update_price(103.0, Utc::now());
        assert_relative_eq!(short.unrealized_pnl, -6.0);
        assert_relative_eq!(short.market_value(), -206.0);
    }

    #[test]
    fn test_exit_trigger_is_directional() {
        let long = position(OrderSide::Buy, 98.0, 105.0);
        assert_eq!(long.exit_trigger(97.5), Some(CloseReason::StopLoss));
        assert_eq!(long.exit_trigger(98.0), Some(CloseReason::StopLoss));
        assert_eq!(long.exit_trigger(105.0), Some(CloseReason::TakeProfit));
        assert_eq!(long.exit_trigger(101.0), None);

        let short = position(OrderSide::Sell, 102.0, 95.0);
        assert_eq!(short.exit_trigger(102.5), Some(CloseReason::StopLoss));
        assert_eq!(short.exit_trigger(94.0), Some(CloseReason::TakeProfit));
        assert_eq!(short.exit_trigger(97.0), None);
    }
}
