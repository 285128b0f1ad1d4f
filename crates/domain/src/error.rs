use thiserror::Error;

use crate::value_objects::InstrumentError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error(transparent)]
    Instrument(#[from] InstrumentError),

    #[error("invalid signal: {0}")]
    InvalidSignal(String),

    #[error("invalid fill: {0}")]
    InvalidFill(String),

    #[error("invalid candle: {0}")]
    InvalidCandle(String),
}
