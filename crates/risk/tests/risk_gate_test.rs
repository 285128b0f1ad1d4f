use approx::assert_relative_eq;
use proptest::prelude::*;

use quant_pilot_core::RiskSettings;
use quant_pilot_domain::{Fill, Instrument, OrderSide, Position, Signal, SignalMetadata};
use quant_pilot_risk::gate::{gated_kelly, sizing_kelly};
use quant_pilot_risk::{RejectReason, RiskDecision, RiskGate};

fn inst(symbol: &str) -> Instrument {
    Instrument::new(symbol).unwrap()
}

fn buy_signal(
    symbol: &str,
    price: f64,
    stop: f64,
    target: f64,
    confidence: f64,
    volatility: f64,
) -> Signal {
    Signal::new(
        inst(symbol),
        OrderSide::Buy,
        price,
        target,
        stop,
        target.max(price * 1.05),
        confidence,
        "5m",
        SignalMetadata {
            volatility,
            ..Default::default()
        },
    )
    .unwrap()
}

fn open_position(symbol: &str) -> Position {
    let signal = buy_signal(symbol, 100.0, 98.0, 105.0, 0.8, 0.05);
    let fill = Fill::from_signal(format!("ord-{}", symbol), &signal, 100.0, 1.0);
    Position::from_fill(format!("pos-{}", symbol), &fill)
}

#[test]
fn sizing_scenario_yields_25_units() {
    let gate = RiskGate::new(RiskSettings::default());
    let state = gate.new_state(10_000.0);
    let signal = buy_signal("BTC/USDT", 100.0, 98.0, 105.0, 0.8, 0.05);

    assert_relative_eq!(signal.reward_risk_ratio(), 2.5);
    assert_relative_eq!(sizing_kelly(&signal), 0.25);
    assert_eq!(gate.size_position(&signal, &state, 10_000.0), 25.0);
}

#[test]
fn sizing_applies_volatility_tier_and_notional_cap() {
    let gate = RiskGate::new(RiskSettings::default());
    let mut state = gate.new_state(10_000.0);

    let volatile = buy_signal("BTC/USDT", 100.0, 98.0, 105.0, 0.8, 0.25);
    assert_eq!(gate.size_position(&volatile, &state, 10_000.0), 17.5);

    state.max_position_size = 1_000.0;
    let capped = buy_signal("BTC/USDT", 100.0, 98.0, 105.0, 0.8, 0.05);
    assert_eq!(gate.size_position(&capped, &state, 10_000.0), 10.0);
}

#[test]
fn sizing_below_minimum_trade_value_is_zero() {
    let gate = RiskGate::new(RiskSettings::default());
    let state = gate.new_state(10_000.0);
    let signal = buy_signal("BTC/USDT", 100.0, 98.0, 105.0, 0.8, 0.05);

    // 2% of $30 over a $2 stop, times 0.25 = 0.08 units after rounding, $8 notional
    assert_eq!(gate.size_position(&signal, &state, 30.0), 0.0);
    assert_eq!(gate.size_position(&signal, &state, 0.0), 0.0);
}

#[test]
fn correlation_gate_only_rejects_above_threshold() {
    let gate = RiskGate::new(RiskSettings::default());
    let mut state = gate.new_state(10_000.0);

    let open = vec![open_position("BTC/USDT"), open_position("ETH/USDT")];
    let sol = buy_signal("SOL/USDT", 100.0, 98.0, 105.0, 0.9, 0.05);
    assert!(gate.validate(&sol, &mut state, &open).is_approved());
    assert_eq!(
        gate.correlation_risk(&sol.instrument, &open, &mut state)
            .map(|(_, c)| c),
        Some(0.3)
    );

    let open = vec![open_position("SOL/USDT")];
    let avax = buy_signal("AVAX/USDT", 100.0, 98.0, 105.0, 0.9, 0.05);
    assert!(gate.validate(&avax, &mut state, &open).is_approved());

    let open = vec![open_position("MATIC/USDT")];
    let bnb = buy_signal("BNB/USDT", 100.0, 98.0, 105.0, 0.9, 0.05);
    assert!(gate.validate(&bnb, &mut state, &open).is_approved());

    let open = vec![open_position("BTC/USDT")];
    let pyramid = buy_signal("BTC/USDT", 100.0, 98.0, 105.0, 0.9, 0.05);
    match gate.validate(&pyramid, &mut state, &open) {
        RiskDecision::Rejected(RejectReason::CorrelationTooHigh { correlation, .. }) => {
            assert_eq!(correlation, 1.0)
        }
        other => panic!("expected correlation rejection, got {:?}", other),
    }
}

#[test]
fn checks_short_circuit_in_order() {
    let gate = RiskGate::new(RiskSettings::default());
    let mut state = gate.new_state(10_000.0);
    let weak = buy_signal("SOL/USDT", 100.0, 98.0, 105.0, 0.5, 0.9);

    state.update_balance(7_500.0);
    assert!(matches!(
        gate.validate(&weak, &mut state, &[]),
        RiskDecision::Rejected(RejectReason::DrawdownExceeded { .. })
    ));

    state.update_balance(10_000.0);
    state.max_open_positions = 1;
    assert!(matches!(
        gate.validate(&weak, &mut state, &[open_position("AAPL")]),
        RiskDecision::Rejected(RejectReason::TooManyPositions { open: 1, max: 1 })
    ));

    state.max_open_positions = 10;
    assert!(matches!(
        gate.validate(&weak, &mut state, &[]),
        RiskDecision::Rejected(RejectReason::LowConfidence { .. })
    ));

    let volatile = buy_signal("SOL/USDT", 100.0, 98.0, 105.0, 0.9, 0.9);
    assert!(matches!(
        gate.validate(&volatile, &mut state, &[]),
        RiskDecision::Rejected(RejectReason::HighVolatility { .. })
    ));

    // reward/risk 0.5 at 66% confidence has negative edge
    let thin = buy_signal("SOL/USDT", 100.0, 98.0, 101.0, 0.66, 0.05);
    assert_eq!(gated_kelly(&thin), 0.0);
    assert!(matches!(
        gate.validate(&thin, &mut state, &[]),
        RiskDecision::Rejected(RejectReason::KellyTooSmall { .. })
    ));
}

#[test]
fn drawdown_at_limit_is_still_allowed() {
    let gate = RiskGate::new(RiskSettings::default());
    let mut state = gate.new_state(10_000.0);
    state.update_balance(8_000.0);
    let signal = buy_signal("SOL/USDT", 100.0, 98.0, 105.0, 0.9, 0.05);
    assert!(gate.validate(&signal, &mut state, &[]).is_approved());
}

proptest! {
    #[test]
    fn kelly_fractions_stay_in_bounds(
        confidence in 0.0f64..=1.0,
        stop_gap in 0.01f64..50.0,
        target_gap in 0.01f64..200.0,
    ) {
        let signal = buy_signal("BTC/USDT", 100.0, 100.0 - stop_gap, 100.0 + target_gap, confidence, 0.0);
        let gated = gated_kelly(&signal);
        let sizing = sizing_kelly(&signal);
        prop_assert!((0.0..=0.25).contains(&gated));
        prop_assert!((0.0..=0.25).contains(&sizing));
    }

    #[test]
    fn sizing_never_grows_with_volatility(
        balance in 100.0f64..1_000_000.0,
        confidence in 0.5f64..=1.0,
        low in 0.0f64..0.5,
        extra in 0.0f64..0.5,
    ) {
        let gate = RiskGate::new(RiskSettings::default());
        let state = gate.new_state(balance);
        let calm = buy_signal("BTC/USDT", 100.0, 98.0, 105.0, confidence, low);
        let wild = buy_signal("BTC/USDT", 100.0, 98.0, 105.0, confidence, low + extra);
        prop_assert!(
            gate.size_position(&wild, &state, balance) <= gate.size_position(&calm, &state, balance)
        );
    }
}
