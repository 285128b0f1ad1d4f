//! Domain enums

pub mod order_enums;
pub mod trade_enums;

pub use order_enums::{OrderSide, OrderStatus, OrderType};
pub use trade_enums::CloseReason;
