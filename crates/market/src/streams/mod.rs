//! Streaming ticker ingestion

mod ticker;
mod ticker_stream;
mod websocket_source;

pub use ticker::{StreamError, Tick, TickStream, TickerSource};
pub use ticker_stream::run_ticker_stream;
pub use websocket_source::{parse_tick_frame, WebsocketTickerSource};
