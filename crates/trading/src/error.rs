use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("position not found: {0}")]
    PositionNotFound(String),

    #[error("duplicate position id: {0}")]
    DuplicatePosition(String),

    #[error("invalid fill: {0}")]
    InvalidFill(String),

    #[error("invalid price {price} for {context}")]
    InvalidPrice { context: String, price: f64 },

    #[error("ledger state serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}
