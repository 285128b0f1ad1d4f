//! Value objects: immutable, identified by value

pub mod forecast;
pub mod indicators;
pub mod instrument;
pub mod signal;

pub use forecast::{Forecast, ForecastDirection, Probabilities};
pub use indicators::{BollingerValue, EmaValue, IndicatorBundle, MacdValue};
pub use instrument::{Instrument, InstrumentError, DEFAULT_EQUITY_QUOTE};
pub use signal::{Signal, SignalMetadata};
