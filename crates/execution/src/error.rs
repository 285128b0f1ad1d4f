use thiserror::Error;

use quant_pilot_domain::{OrderStatus, VenueError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error(transparent)]
    Venue(#[from] VenueError),

    #[error("order {order_id} not filled: {status}")]
    NotFilled { order_id: String, status: OrderStatus },

    #[error("invalid order quantity: {0}")]
    InvalidQuantity(f64),
}

impl ExecutionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ExecutionError::Venue(e) if e.is_transient())
    }
}
