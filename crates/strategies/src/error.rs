use thiserror::Error;

use quant_pilot_domain::DomainError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("strategy not registered: {0}")]
    UnknownStrategy(String),

    #[error("{0} has no usable price")]
    NoPrice(String),

    #[error("could not build signal: {0}")]
    Signal(#[from] DomainError),
}
