//! Entities

pub mod candle;
pub mod closed_trade;
pub mod fill;
pub mod market_snapshot;
pub mod order;
pub mod position;

pub use candle::Candle;
pub use closed_trade::ClosedTrade;
pub use fill::Fill;
pub use market_snapshot::MarketSnapshot;
pub use order::{AccountInfo, OrderRequest, OrderResult, Quote, VenuePosition};
pub use position::Position;
