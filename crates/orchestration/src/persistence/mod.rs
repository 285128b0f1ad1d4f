//! Asynchronous persistence of position and trade events

mod trade_store;

pub use trade_store::{spawn_trade_store_worker, JsonlTradeStore, TradeStore};
