//! # Quant Pilot Execution
//!
//! Order execution: the paper-trading venue, venue selection and the order
//! service that turns approved signals into fills.

pub mod error;
pub mod order_manager;
pub mod venue;

pub use error::ExecutionError;
pub use order_manager::OrderService;
pub use venue::{PaperVenue, PaperVenueConfig, VenueFactory};
