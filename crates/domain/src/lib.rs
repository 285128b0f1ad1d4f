//! # Quant Pilot Domain
//!
//! Domain model shared by every other crate. No I/O lives here.
//!
//! - `value_objects`: Instrument, Signal, Forecast, indicator readings
//! - `entities`: Candle, MarketSnapshot, Fill, Position, ClosedTrade, venue request/result types
//! - `enums`: order side/type/status, close reasons
//! - `traits`: the `MarketVenue` and `Predictor` collaborator contracts
//! - `events`: `EngineEvent` and the broadcast `EventBus`

pub mod entities;
pub mod enums;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

pub use entities::{
    AccountInfo, Candle, ClosedTrade, Fill, MarketSnapshot, OrderRequest, OrderResult, Position,
    Quote, VenuePosition,
};
pub use enums::{CloseReason, OrderSide, OrderStatus, OrderType};
pub use error::DomainError;
pub use events::{EngineEvent, EventBus};
pub use traits::{MarketVenue, Predictor, PredictorError, VenueError};
pub use value_objects::{
    BollingerValue, EmaValue, Forecast, ForecastDirection, IndicatorBundle, Instrument,
    InstrumentError, MacdValue, Probabilities, Signal, SignalMetadata,
};
