use std::collections::HashMap;

use approx::assert_relative_eq;
use chrono::Utc;
use proptest::prelude::*;

use quant_pilot_domain::{CloseReason, Fill, Instrument, OrderSide};
use quant_pilot_trading::PortfolioLedger;

fn fill(order_id: &str, symbol: &str, side: OrderSide, price: f64, qty: f64) -> Fill {
    let (stop_loss, take_profit) = match side {
        OrderSide::Buy => (price - 2.0, price + 5.0),
        OrderSide::Sell => (price + 2.0, price - 5.0),
    };
    Fill {
        order_id: order_id.to_string(),
        instrument: Instrument::new(symbol).unwrap(),
        side,
        price,
        quantity: qty,
        stop_loss,
        take_profit,
        signal_id: Some(format!("sig-{}", order_id)),
        filled_at: Utc::now(),
    }
}

fn prices(entries: &[(&str, f64)]) -> HashMap<Instrument, f64> {
    entries
        .iter()
        .map(|(s, p)| (Instrument::new(s).unwrap(), *p))
        .collect()
}

#[test]
fn stop_loss_tick_closes_position_in_same_update() {
    let mut ledger = PortfolioLedger::new("USDT", 10_000.0);
    ledger
        .open_position(fill("o1", "BTC/USDT", OrderSide::Buy, 100.0, 10.0))
        .unwrap();
    ledger
        .open_position(fill("o2", "ETH/USDT", OrderSide::Buy, 50.0, 4.0))
        .unwrap();

    let closed = ledger.update_prices(&prices(&[("BTC/USDT", 97.5), ("ETH/USDT", 51.0)]));

    assert_eq!(closed.len(), 1);
    let trade = &closed[0];
    assert_eq!(trade.reason, CloseReason::StopLoss);
    assert_eq!(trade.exit_price, 97.5);
    assert_relative_eq!(trade.realized_pnl, -25.0);
    assert_eq!(ledger.open_position_count(), 1);
    assert!(!ledger.has_position(&Instrument::new("BTC/USDT").unwrap()));
    assert_eq!(ledger.trade_history().len(), 1);
}

#[test]
fn take_profit_is_directional_for_shorts() {
    let mut ledger = PortfolioLedger::new("USDT", 10_000.0);
    ledger
        .open_position(fill("o1", "SOL/USDT", OrderSide::Sell, 100.0, 2.0))
        .unwrap();

    // a rise towards the target of a long does nothing for a short
    assert!(ledger.update_prices(&prices(&[("SOL/USDT", 101.0)])).is_empty());

    let closed = ledger.update_prices(&prices(&[("SOL/USDT", 95.0)]));
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].reason, CloseReason::TakeProfit);
    assert_relative_eq!(closed[0].realized_pnl, 10.0);
}

#[test]
fn export_import_round_trip() {
    let mut ledger = PortfolioLedger::new("USDT", 10_000.0);
    ledger
        .open_position(fill("o1", "BTC/USDT", OrderSide::Buy, 100.0, 2.0))
        .unwrap();
    ledger
        .open_position(fill("o2", "ETH/USDT", OrderSide::Sell, 40.0, 5.0))
        .unwrap();
    ledger.close_position("pos_o2", Some(38.5), CloseReason::Manual).unwrap();
    ledger.update_prices(&prices(&[("BTC/USDT", 101.5)]));

    let exported = ledger.export_state();
    let restored = PortfolioLedger::from_json(&ledger.to_json().unwrap()).unwrap();
    assert_eq!(restored.export_state(), exported);

    let mut other = PortfolioLedger::new("USD", 1.0);
    other.import_state(exported.clone());
    assert_eq!(other.export_state(), exported);
    assert_eq!(other.cash_balance(), ledger.cash_balance());
    assert_eq!(other.equity(), ledger.equity());
}

#[test]
fn empty_history_metrics_are_zero() {
    let ledger = PortfolioLedger::new("USDT", 10_000.0);
    let metrics = ledger.performance_metrics();
    assert_eq!(metrics.total_trades, 0);
    assert_eq!(metrics.sharpe_ratio, 0.0);
    assert_eq!(metrics.max_drawdown, 0.0);
    assert!(!metrics.win_rate.is_nan());
}

fn side_strategy() -> impl Strategy<Value = OrderSide> {
    prop_oneof![Just(OrderSide::Buy), Just(OrderSide::Sell)]
}

proptest! {
    #[test]
    fn realized_pnl_sign_follows_side(
        side in side_strategy(),
        entry in 10.0f64..1_000.0,
        exit in 10.0f64..1_000.0,
        qty in 0.01f64..100.0,
    ) {
        let mut ledger = PortfolioLedger::new("USDT", 1_000_000.0);
        let position = ledger.open_position(fill("o1", "BTC/USDT", side, entry, qty)).unwrap();
        let trade = ledger.close_position(&position.id, Some(exit), CloseReason::Manual).unwrap();

        let expected = (exit - entry) * side.sign();
        if expected > 0.0 {
            prop_assert!(trade.realized_pnl > 0.0);
        } else if expected < 0.0 {
            prop_assert!(trade.realized_pnl < 0.0);
        } else {
            prop_assert_eq!(trade.realized_pnl, 0.0);
        }
    }

    #[test]
    fn realized_pnl_matches_cash_change(
        trades in prop::collection::vec(
            (side_strategy(), 10.0f64..500.0, 10.0f64..500.0, 0.1f64..10.0),
            1..30,
        ),
    ) {
        let initial = 1_000_000.0;
        let mut ledger = PortfolioLedger::new("USDT", initial);
        for (i, (side, entry, exit, qty)) in trades.iter().enumerate() {
            let position = ledger
                .open_position(fill(&format!("o{}", i), "BTC/USDT", *side, *entry, *qty))
                .unwrap();
            ledger.close_position(&position.id, Some(*exit), CloseReason::Manual).unwrap();
        }

        let history_sum: f64 = ledger.trade_history().iter().map(|t| t.realized_pnl).sum();
        prop_assert!((ledger.cash_balance() - initial - ledger.realized_pnl()).abs() < 1e-6);
        prop_assert!((history_sum - ledger.realized_pnl()).abs() < 1e-6);
        prop_assert!(ledger.balance("BTC").abs() < 1e-9);
    }
}
