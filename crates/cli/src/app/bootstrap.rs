//! Wires the engine, its event consumers and the shutdown sequence

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use quant_pilot_core::config::{ShutdownConfig, ShutdownManager};
use quant_pilot_core::AppConfig;
use quant_pilot_domain::{EventBus, Predictor};
use quant_pilot_execution::VenueFactory;
use quant_pilot_market::WebsocketTickerSource;
use quant_pilot_orchestration::{
    spawn_event_logger, spawn_trade_store_worker, JsonlTradeStore, TradingEngine,
};
use quant_pilot_strategies::TrendPredictor;

/// Runs until a termination signal, then stops the engine (liquidating open
/// positions) and drains the event consumers.
pub async fn run_engine(config: AppConfig) -> Result<()> {
    info!(
        "starting {} trading on {:?} ({} domain)",
        config.mode, config.instruments, config.domain
    );

    let venue = VenueFactory::new()
        .create(&config)
        .context("creating market venue")?;
    let predictor: Arc<dyn Predictor> = Arc::new(TrendPredictor::default());
    let events = EventBus::default();

    let logger = spawn_event_logger(&events);
    let (store_shutdown, store_shutdown_rx) = broadcast::channel::<()>(1);
    let store = config.persistence.trade_log_path.as_ref().map(|path| {
        info!("persisting trades to {}", path);
        spawn_trade_store_worker(
            &events,
            Arc::new(JsonlTradeStore::new(path)),
            store_shutdown_rx,
        )
    });

    let engine = Arc::new(
        TradingEngine::new(config.clone(), venue, Some(predictor), events)
            .context("building trading engine")?,
    );

    let feed = config.market_data.ticker_ws_url.as_ref().map(|url| {
        info!("streaming ticks from {}", url);
        let source = WebsocketTickerSource::new(url.clone(), engine.instruments().to_vec());
        engine.attach_ticker_stream(Arc::new(source))
    });

    engine.start().await.context("starting trading engine")?;

    let signal = ShutdownManager::wait_for_shutdown_signal().await?;
    info!("received {}, shutting down", signal);

    let manager = ShutdownManager::new(ShutdownConfig {
        total_timeout: Duration::from_secs(60),
        hook_timeout: Duration::from_secs(45),
    });

    let stopping = engine.clone();
    manager
        .register_shutdown_hook("engine_stop", move || {
            let engine = stopping.clone();
            async move {
                let report = engine.stop().await;
                if report.failed > 0 {
                    warn!("{} positions could not be liquidated", report.failed);
                }
                let status = engine.status().await;
                info!(
                    "final equity {:.2}, realized pnl {:.2}",
                    status.equity, status.realized_pnl
                );
                Ok(())
            }
        })
        .await;

    let feed = std::sync::Mutex::new(feed);
    manager
        .register_shutdown_hook("ticker_stream", move || {
            let handle = feed.lock().ok().and_then(|mut h| h.take());
            async move {
                if let Some(handle) = handle {
                    if let Err(e) = handle.await {
                        error!("ticker stream task failed: {}", e);
                    }
                }
                Ok(())
            }
        })
        .await;

    let store = std::sync::Mutex::new(store);
    manager
        .register_shutdown_hook("trade_store", move || {
            let _ = store_shutdown.send(());
            let handle = store.lock().ok().and_then(|mut h| h.take());
            async move {
                if let Some(handle) = handle {
                    if let Err(e) = handle.await {
                        error!("trade store worker failed: {}", e);
                    }
                }
                Ok(())
            }
        })
        .await;

    manager.shutdown().await?;
    logger.abort();
    info!("quant-pilot stopped");
    Ok(())
}
