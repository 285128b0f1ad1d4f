//! Tradable instrument identifier

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Quote currency assumed for a bare equity ticker such as `AAPL`
pub const DEFAULT_EQUITY_QUOTE: &str = "USD";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstrumentError {
    #[error("instrument symbol is empty")]
    Empty,

    #[error("invalid instrument format: {0}")]
    InvalidFormat(String),

    #[error("instrument contains illegal characters: {0}")]
    IllegalCharacter(String),
}

/// Instrument such as `BTC/USDT` or `AAPL`.
///
/// Rules:
/// - pairs are written `BASE/QUOTE`; `BASE-QUOTE` is accepted and normalised
/// - symbols are upper-cased
/// - a bare ticker trades against [`DEFAULT_EQUITY_QUOTE`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Instrument {
    symbol: String,
    base: String,
    quote: String,
}

impl Instrument {
    pub fn new(value: impl AsRef<str>) -> Result<Self, InstrumentError> {
        let value = value.as_ref().trim().to_uppercase();
        if value.is_empty() {
            return Err(InstrumentError::Empty);
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '/' || c == '-' || c == '.')
        {
            return Err(InstrumentError::IllegalCharacter(value));
        }

        let parts: Vec<&str> = value.split(|c| c == '/' || c == '-').collect();
        match parts.as_slice() {
            [ticker] => Ok(Self {
                symbol: ticker.to_string(),
                base: ticker.to_string(),
                quote: DEFAULT_EQUITY_QUOTE.to_string(),
            }),
            [base, quote] if !base.is_empty() && !quote.is_empty() => Ok(Self {
                symbol: format!("{}/{}", base, quote),
                base: base.to_string(),
                quote: quote.to_string(),
            }),
            _ => Err(InstrumentError::InvalidFormat(format!(
                "expected BASE/QUOTE or TICKER, got {}",
                value
            ))),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// `BTC` for `BTC/USDT`, the ticker itself for equities
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    pub fn is_pair(&self) -> bool {
        self.symbol.contains('/')
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

impl FromStr for Instrument {
    type Err = InstrumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Instrument::new(s)
    }
}

impl TryFrom<String> for Instrument {
    type Error = InstrumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Instrument::new(value)
    }
}

impl From<Instrument> for String {
    fn from(instrument: Instrument) -> Self {
        instrument.symbol
    }
}
