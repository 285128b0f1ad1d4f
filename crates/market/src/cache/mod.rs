mod market_data_cache;

pub use market_data_cache::{MarketDataCache, SnapshotError, DEFAULT_CANDLE_WINDOW};
