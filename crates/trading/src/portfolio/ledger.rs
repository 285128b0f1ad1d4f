use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::Utc;
use tracing::{debug, info, warn};

use quant_pilot_analytics::{PerformanceCalculator, PerformanceMetrics};
use quant_pilot_domain::{
    CloseReason, ClosedTrade, EngineEvent, EventBus, Fill, Instrument, OrderSide, Position,
};

use super::snapshot::LedgerSnapshot;
use crate::error::LedgerError;

/// Closed trades kept for performance metrics; oldest are evicted first
pub const MAX_TRADE_HISTORY: usize = 1000;

/// Authoritative record of open positions and asset balances.
///
/// Opening a BUY debits the quote asset and credits the base asset, a SELL
/// does the inverse, and closing reverses the open at the exit price. The
/// difference left in the quote asset is the realized P&L, so
/// `realized_pnl()` always matches the quote-side cash change from closed
/// positions. Quote assets are valued one-to-one with the account currency.
pub struct PortfolioLedger {
    account_currency: String,
    initial_cash: f64,
    balances: BTreeMap<String, f64>,
    /// Every quote asset ever traded plus the account currency
    quote_assets: BTreeSet<String>,
    positions: BTreeMap<String, Position>,
    trade_history: Vec<ClosedTrade>,
    realized_pnl: f64,
    evicted_pnl: f64,
    events: Option<EventBus>,
}

impl PortfolioLedger {
    pub fn new(account_currency: impl Into<String>, initial_cash: f64) -> Self {
        let account_currency = account_currency.into().to_uppercase();
        let mut balances = BTreeMap::new();
        balances.insert(account_currency.clone(), initial_cash);
        let quote_assets = BTreeSet::from([account_currency.clone()]);
        Self {
            account_currency,
            initial_cash,
            balances,
            quote_assets,
            positions: BTreeMap::new(),
            trade_history: Vec::new(),
            realized_pnl: 0.0,
            evicted_pnl: 0.0,
            events: None,
        }
    }

    /// Publishes position and trade events on `bus`
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    fn publish(&self, event: EngineEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }

    fn credit(&mut self, asset: &str, amount: f64) {
        *self.balances.entry(asset.to_string()).or_insert(0.0) += amount;
    }

    /// Applies asset movements for trading `quantity` at `price` on `side`
    fn settle(&mut self, instrument: &Instrument, side: OrderSide, price: f64, quantity: f64) {
        let sign = side.sign();
        self.credit(instrument.quote(), -sign * price * quantity);
        self.credit(instrument.base(), sign * quantity);
    }

    /// Registers a filled order as a new position
    pub fn open_position(&mut self, fill: Fill) -> Result<Position, LedgerError> {
        if !(fill.price.is_finite() && fill.price > 0.0) {
            return Err(LedgerError::InvalidFill(format!(
                "{} price must be positive, got {}",
                fill.order_id, fill.price
            )));
        }
        if !(fill.quantity.is_finite() && fill.quantity > 0.0) {
            return Err(LedgerError::InvalidFill(format!(
                "{} quantity must be positive, got {}",
                fill.order_id, fill.quantity
            )));
        }
        let id = format!("pos_{}", fill.order_id);
        if self.positions.contains_key(&id) {
            return Err(LedgerError::DuplicatePosition(id));
        }

        self.settle(&fill.instrument, fill.side, fill.price, fill.quantity);
        self.quote_assets.insert(fill.instrument.quote().to_string());
        let position = Position::from_fill(id.clone(), &fill);
        info!(
            "opened {} {} {} @ {} (stop {}, target {})",
            position.id,
            position.side,
            position.quantity,
            position.entry_price,
            position.stop_loss,
            position.take_profit
        );
        self.positions.insert(id, position.clone());
        self.publish(EngineEvent::PositionOpened(position.clone()));
        Ok(position)
    }

    /// Marks positions to market and closes any whose stop-loss or
    /// take-profit was crossed, at the tick price.
    ///
    /// Returns the trades closed by this update.
    pub fn update_prices(&mut self, prices: &HashMap<Instrument, f64>) -> Vec<ClosedTrade> {
        let now = Utc::now();
        let mut exits = Vec::new();

        for position in self.positions.values_mut() {
            let Some(&price) = prices.get(&position.instrument) else {
                continue;
            };
            if !(price.is_finite() && price > 0.0) {
                warn!("{}: ignoring invalid price {}", position.instrument, price);
                continue;
            }
            position.update_price(price, now);
            if let Some(reason) = position.exit_trigger(price) {
                exits.push((position.id.clone(), price, reason));
            } else if let Some(bus) = &self.events {
                bus.publish(EngineEvent::PositionUpdated(position.clone()));
            }
        }

        let mut closed = Vec::with_capacity(exits.len());
        for (id, price, reason) in exits {
            match self.close_position(&id, Some(price), reason) {
                Ok(trade) => closed.push(trade),
                Err(e) => warn!("protective close of {} failed: {}", id, e),
            }
        }
        closed
    }

    /// Closes a position at `exit_price`, or at its last marked price
    pub fn close_position(
        &mut self,
        id: &str,
        exit_price: Option<f64>,
        reason: CloseReason,
    ) -> Result<ClosedTrade, LedgerError> {
        let current = self
            .positions
            .get(id)
            .ok_or_else(|| LedgerError::PositionNotFound(id.to_string()))?
            .current_price;
        let exit_price = exit_price.unwrap_or(current);
        if !(exit_price.is_finite() && exit_price > 0.0) {
            return Err(LedgerError::InvalidPrice {
                context: format!("close of {}", id),
                price: exit_price,
            });
        }
        let position = self
            .positions
            .remove(id)
            .ok_or_else(|| LedgerError::PositionNotFound(id.to_string()))?;

        self.settle(
            &position.instrument,
            position.side.opposite(),
            exit_price,
            position.quantity,
        );
        let trade = ClosedTrade {
            position_id: position.id.clone(),
            instrument: position.instrument.clone(),
            side: position.side,
            entry_price: position.entry_price,
            exit_price,
            quantity: position.quantity,
            realized_pnl: position.pnl_at(exit_price),
            reason,
            opened_at: position.opened_at,
            closed_at: Utc::now(),
        };
        self.realized_pnl += trade.realized_pnl;
        self.record_trade(trade.clone());

        info!(
            "closed {} {} @ {} ({}): pnl {:.2}",
            trade.position_id, trade.instrument, exit_price, reason, trade.realized_pnl
        );
        self.publish(EngineEvent::PositionClosed(trade.clone()));
        self.publish(EngineEvent::TradeRecorded(trade.clone()));
        Ok(trade)
    }

    fn record_trade(&mut self, trade: ClosedTrade) {
        self.trade_history.push(trade);
        while self.trade_history.len() > MAX_TRADE_HISTORY {
            let evicted = self.trade_history.remove(0);
            self.evicted_pnl += evicted.realized_pnl;
            debug!("evicted {} from trade history", evicted.position_id);
        }
    }

    pub fn open_positions(&self) -> Vec<Position> {
        self.positions.values().cloned().collect()
    }

    pub fn open_position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn position(&self, id: &str) -> Option<&Position> {
        self.positions.get(id)
    }

    pub fn has_position(&self, instrument: &Instrument) -> bool {
        self.positions.values().any(|p| &p.instrument == instrument)
    }

    pub fn account_currency(&self) -> &str {
        &self.account_currency
    }

    pub fn balances(&self) -> &BTreeMap<String, f64> {
        &self.balances
    }

    pub fn balance(&self, asset: &str) -> f64 {
        self.balances.get(asset).copied().unwrap_or(0.0)
    }

    pub fn cash_balance(&self) -> f64 {
        self.balance(&self.account_currency)
    }

    /// Quote-asset cash plus the signed market value of open positions
    pub fn equity(&self) -> f64 {
        let cash: f64 = self.quote_assets.iter().map(|q| self.balance(q)).sum();
        cash + self.positions.values().map(Position::market_value).sum::<f64>()
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.positions.values().map(|p| p.unrealized_pnl).sum()
    }

    /// Cumulative realized P&L, including trades evicted from history
    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn trade_history(&self) -> &[ClosedTrade] {
        &self.trade_history
    }

    /// Metrics over the retained history, with the equity curve starting at
    /// the initial cash plus any P&L that has aged out of the history
    pub fn performance_metrics(&self) -> PerformanceMetrics {
        PerformanceCalculator::new(self.initial_cash + self.evicted_pnl, &self.trade_history)
            .calculate()
    }

    pub fn export_state(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            account_currency: self.account_currency.clone(),
            initial_cash: self.initial_cash,
            balances: self.balances.clone(),
            quote_assets: self.quote_assets.clone(),
            positions: self.open_positions(),
            trade_history: self.trade_history.clone(),
            realized_pnl: self.realized_pnl,
            evicted_pnl: self.evicted_pnl,
        }
    }

    /// Replaces the whole state; the event bus is kept
    pub fn import_state(&mut self, snapshot: LedgerSnapshot) {
        self.account_currency = snapshot.account_currency;
        self.initial_cash = snapshot.initial_cash;
        self.balances = snapshot.balances;
        self.positions = snapshot
            .positions
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        self.trade_history = snapshot.trade_history;
        // snapshots written before quote tracking only know the retained trades
        self.quote_assets = snapshot.quote_assets;
        self.quote_assets.insert(self.account_currency.clone());
        for instrument in self
            .positions
            .values()
            .map(|p| &p.instrument)
            .chain(self.trade_history.iter().map(|t| &t.instrument))
        {
            self.quote_assets.insert(instrument.quote().to_string());
        }
        self.realized_pnl = snapshot.realized_pnl;
        self.evicted_pnl = snapshot.evicted_pnl;
        info!(
            "imported ledger: {} open positions, {} closed trades",
            self.positions.len(),
            self.trade_history.len()
        );
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let mut ledger = Self::new(snapshot.account_currency.clone(), snapshot.initial_cash);
        ledger.import_state(snapshot);
        ledger
    }

    pub fn to_json(&self) -> Result<String, LedgerError> {
        Ok(serde_json::to_string_pretty(&self.export_state())?)
    }

    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        let snapshot: LedgerSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Utc;

    fn fill(order_id: &str, symbol: &str, side: OrderSide, price: f64, qty: f64) -> Fill {
        let (stop_loss, take_profit) = match side {
            OrderSide::Buy => (price * 0.98, price * 1.05),
            OrderSide::Sell => (price * 1.02, price * 0.95),
        };
        Fill {
            order_id: order_id.to_string(),
            instrument: Instrument::new(symbol).unwrap(),
            side,
            price,
            quantity: qty,
            stop_loss,
            take_profit,
            signal_id: None,
            filled_at: Utc::now(),
        }
    }

    #[test]
    fn test_buy_moves_quote_and_base() {
        let mut ledger = PortfolioLedger::new("usdt", 10_000.0);
        ledger
            .open_position(fill("o1", "BTC/USDT", OrderSide::Buy, 100.0, 2.0))
            .unwrap();
        assert_eq!(ledger.cash_balance(), 9_800.0);
        assert_eq!(ledger.balance("BTC"), 2.0);
        assert_eq!(ledger.equity(), 10_000.0);
    }

    #[test]
    fn test_sell_close_realizes_profit_on_drop() {
        let mut ledger = PortfolioLedger::new("USDT", 10_000.0);
        let position = ledger
            .open_position(fill("o1", "ETH/USDT", OrderSide::Sell, 100.0, 3.0))
            .unwrap();
        assert_eq!(ledger.cash_balance(), 10_300.0);
        assert_eq!(ledger.balance("ETH"), -3.0);

        let trade = ledger
            .close_position(&position.id, Some(97.0), CloseReason::Manual)
            .unwrap();
        assert_relative_eq!(trade.realized_pnl, 9.0);
        assert_relative_eq!(ledger.cash_balance(), 10_009.0);
        assert_relative_eq!(ledger.balance("ETH"), 0.0);
        assert_eq!(ledger.open_position_count(), 0);
    }

    #[test]
    fn test_close_defaults_to_marked_price() {
        let mut ledger = PortfolioLedger::new("USDT", 10_000.0);
        let position = ledger
            .open_position(fill("o1", "BTC/USDT", OrderSide::Buy, 100.0, 1.0))
            .unwrap();
        let mut prices = HashMap::new();
        prices.insert(Instrument::new("BTC/USDT").unwrap(), 102.0);
        assert!(ledger.update_prices(&prices).is_empty());
        assert_relative_eq!(ledger.unrealized_pnl(), 2.0);

        let trade = ledger
            .close_position(&position.id, None, CloseReason::Liquidation)
            .unwrap();
        assert_eq!(trade.exit_price, 102.0);
    }

    #[test]
    fn test_rejects_bad_fills_and_unknown_ids() {
        let mut ledger = PortfolioLedger::new("USDT", 1_000.0);
        assert!(matches!(
            ledger.open_position(fill("o1", "BTC/USDT", OrderSide::Buy, 100.0, 0.0)),
            Err(LedgerError::InvalidFill(_))
        ));
        ledger
            .open_position(fill("o1", "BTC/USDT", OrderSide::Buy, 100.0, 1.0))
            .unwrap();
        assert!(matches!(
            ledger.open_position(fill("o1", "BTC/USDT", OrderSide::Buy, 100.0, 1.0)),
            Err(LedgerError::DuplicatePosition(_))
        ));
        assert!(matches!(
            ledger.close_position("pos_missing", None, CloseReason::Manual),
            Err(LedgerError::PositionNotFound(_))
        ));
        assert!(matches!(
            ledger.close_position("pos_o1", Some(-1.0), CloseReason::Manual),
            Err(LedgerError::InvalidPrice { .. })
        ));
        assert_eq!(ledger.open_position_count(), 1);
    }

    #[test]
    fn test_history_is_bounded_and_pnl_kept() {
        let mut ledger = PortfolioLedger::new("USDT", 100_000.0);
        for i in 0..(MAX_TRADE_HISTORY + 5) {
            let id = format!("o{}", i);
            let position = ledger
                .open_position(fill(&id, "BTC/USDT", OrderSide::Buy, 100.0, 1.0))
                .unwrap();
            ledger
                .close_position(&position.id, Some(101.0), CloseReason::Manual)
                .unwrap();
        }
        assert_eq!(ledger.trade_history().len(), MAX_TRADE_HISTORY);
        assert_eq!(ledger.trade_history()[0].position_id, "pos_o5");
        assert_relative_eq!(ledger.realized_pnl(), (MAX_TRADE_HISTORY + 5) as f64);

        let metrics = ledger.performance_metrics();
        assert_eq!(metrics.total_trades, MAX_TRADE_HISTORY);
        assert_relative_eq!(
            *metrics.equity_curve.last().unwrap(),
            100_000.0 + ledger.realized_pnl(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_equity_keeps_quote_balance_after_its_trades_age_out() {
        let mut ledger = PortfolioLedger::new("USDT", 100_000.0);
        ledger.credit("USDC", 1_000.0);
        let position = ledger
            .open_position(fill("eth", "ETH/USDC", OrderSide::Buy, 100.0, 1.0))
            .unwrap();
        ledger
            .close_position(&position.id, Some(110.0), CloseReason::Manual)
            .unwrap();
        assert_relative_eq!(ledger.balance("USDC"), 1_010.0);

        for i in 0..MAX_TRADE_HISTORY {
            let id = format!("o{}", i);
            let position = ledger
                .open_position(fill(&id, "BTC/USDT", OrderSide::Buy, 100.0, 1.0))
                .unwrap();
            ledger
                .close_position(&position.id, Some(100.0), CloseReason::Manual)
                .unwrap();
        }
        assert!(ledger
            .trade_history()
            .iter()
            .all(|t| t.instrument.quote() == "USDT"));
        assert_relative_eq!(ledger.equity(), 101_010.0, epsilon = 1e-6);

        let restored = PortfolioLedger::from_json(&ledger.to_json().unwrap()).unwrap();
        assert_relative_eq!(restored.equity(), 101_010.0, epsilon = 1e-6);
    }

    #[tokio::test]
    async fn test_events_published() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let mut ledger = PortfolioLedger::new("USDT", 10_000.0).with_event_bus(bus);

        let position = ledger
            .open_position(fill("o1", "BTC/USDT", OrderSide::Buy, 100.0, 1.0))
            .unwrap();
        ledger
            .close_position(&position.id, Some(104.0), CloseReason::Manual)
            .unwrap();

        let kinds: Vec<&str> = (0..3).map(|_| rx.try_recv().unwrap().kind()).collect();
        assert_eq!(kinds, vec!["position_opened", "position_closed", "trade_recorded"]);
    }
}
