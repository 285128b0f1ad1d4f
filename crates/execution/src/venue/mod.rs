mod paper_venue;
mod venue_factory;

pub use paper_venue::{PaperVenue, PaperVenueConfig, DEFAULT_SEED_PRICE};
pub use venue_factory::VenueFactory;
