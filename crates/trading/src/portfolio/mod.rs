//! In-memory portfolio: positions, asset balances and closed-trade history

mod ledger;
mod snapshot;

pub use ledger::{PortfolioLedger, MAX_TRADE_HISTORY};
pub use snapshot::LedgerSnapshot;
