//! # Quant Pilot Trading
//!
//! The portfolio ledger (positions, balances, trade history) and the order
//! lifecycle state machine.

pub mod error;
pub mod order;
pub mod portfolio;

pub use error::LedgerError;
pub use order::{OrderStateMachine, TransitionError};
pub use portfolio::{LedgerSnapshot, PortfolioLedger, MAX_TRADE_HISTORY};
