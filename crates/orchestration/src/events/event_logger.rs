use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use quant_pilot_domain::{EngineEvent, EventBus};

/// Writes every engine event to the log; ends when the bus closes
pub fn spawn_event_logger(bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("event logger lagged, {} events skipped", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &EngineEvent) {
    match event {
        EngineEvent::SignalGenerated(signal) => info!(
            "signal {} {} {} @ {:.4} conf {:.3} [{}]",
            signal.id,
            signal.action,
            signal.instrument,
            signal.price,
            signal.confidence,
            signal.metadata.source
        ),
        EngineEvent::SignalRejected {
            signal_id,
            instrument,
            reason,
        } => info!("signal {} {} rejected: {}", signal_id, instrument, reason),
        EngineEvent::SignalExpired {
            signal_id,
            instrument,
            age_secs,
        } => warn!(
            "signal {} {} expired after {}s",
            signal_id, instrument, age_secs
        ),
        EngineEvent::OrderExecuted {
            order_id,
            instrument,
            side,
            quantity,
            price,
            ..
        } => info!(
            "order {} {} {} {} @ {:.4}",
            order_id, side, quantity, instrument, price
        ),
        EngineEvent::OrderFailed {
            instrument, reason, ..
        } => error!("order for {} failed: {}", instrument, reason),
        EngineEvent::PositionOpened(p) => debug!("position {} opened", p.id),
        EngineEvent::PositionUpdated(p) => debug!(
            "position {} @ {:.4} upnl {:.2}",
            p.id, p.current_price, p.unrealized_pnl
        ),
        EngineEvent::PositionClosed(t) => debug!("position {} closed ({})", t.position_id, t.reason),
        EngineEvent::TradeRecorded(t) => info!(
            "trade {} {} {} pnl {:.2}",
            t.position_id, t.side, t.instrument, t.realized_pnl
        ),
        EngineEvent::RiskAdjusted {
            risk_per_trade,
            max_open_positions,
            reason,
        } => warn!(
            "risk adjusted: per trade {:.4}, max open {} ({})",
            risk_per_trade, max_open_positions, reason
        ),
        EngineEvent::Error {
            context, message, ..
        } => error!("{}: {}", context, message),
    }
}
