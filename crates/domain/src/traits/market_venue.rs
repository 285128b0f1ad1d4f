//! Market venue contract
//!
//! The engine talks to brokers and exchanges only through this trait. Adapters
//! return typed results; connectivity loss is `VenueError::Unavailable` and a
//! broker-side refusal is `VenueError::OrderRejected`.

use async_trait::async_trait;
use thiserror::Error;

use crate::entities::{AccountInfo, Candle, OrderRequest, OrderResult, Quote};
use crate::value_objects::Instrument;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VenueError {
    #[error("venue unavailable: {0}")]
    Unavailable(String),

    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("unknown order: {0}")]
    UnknownOrder(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl VenueError {
    /// Worth retrying on the next cycle
    pub fn is_transient(&self) -> bool {
        matches!(self, VenueError::Unavailable(_))
    }
}

#[async_trait]
pub trait MarketVenue: Send + Sync {
    fn name(&self) -> &str;

    /// Latest price, volume and top of book
    async fn fetch_snapshot(&self, instrument: &Instrument) -> Result<Quote, VenueError>;

    /// Up to `count` candles, oldest first
    async fn fetch_candles(
        &self,
        instrument: &Instrument,
        timeframe: &str,
        count: usize,
    ) -> Result<Vec<Candle>, VenueError>;

    async fn place_order(&self, request: OrderRequest) -> Result<OrderResult, VenueError>;

    async fn cancel_order(&self, order_id: &str) -> Result<(), VenueError>;

    async fn get_account(&self) -> Result<AccountInfo, VenueError>;
}
