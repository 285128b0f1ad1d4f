use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use quant_pilot_domain::Instrument;

/// One streamed price update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub instrument: Instrument,
    pub price: f64,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("stream transport error: {0}")]
    Transport(String),

    #[error("malformed message: {0}")]
    Malformed(String),
}

pub type TickStream = Pin<Box<dyn Stream<Item = Result<Tick, StreamError>> + Send>>;

/// Source of live ticks; each `connect` opens a fresh stream
#[async_trait]
pub trait TickerSource: Send + Sync {
    fn name(&self) -> &str;

    async fn connect(&self) -> Result<TickStream, StreamError>;
}
