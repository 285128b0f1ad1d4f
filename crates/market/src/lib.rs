//! # Quant Pilot Market
//!
//! Market data: the per-instrument snapshot cache, indicator computation and
//! the streaming ticker feed that writes into the cache.

pub mod cache;
pub mod indicators;
pub mod streams;

pub use cache::{MarketDataCache, SnapshotError};
pub use streams::{run_ticker_stream, Tick, TickerSource, WebsocketTickerSource};
