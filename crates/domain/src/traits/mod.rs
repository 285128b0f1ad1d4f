//! Collaborator contracts

pub mod market_venue;
pub mod predictor;

pub use market_venue::{MarketVenue, VenueError};
pub use predictor::{Predictor, PredictorError};
