use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use quant_pilot_domain::{EngineEvent, EventBus};

/// Sink for persistable engine events
#[async_trait]
pub trait TradeStore: Send + Sync {
    fn name(&self) -> &str;

    async fn persist(&self, event: &EngineEvent) -> Result<()>;
}

/// Appends one JSON object per event to a file
pub struct JsonlTradeStore {
    path: PathBuf,
}

impl JsonlTradeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TradeStore for JsonlTradeStore {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn persist(&self, event: &EngineEvent) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening {}", self.path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

async fn store_event(store: &dyn TradeStore, event: &EngineEvent) {
    if !event.is_persistable() {
        return;
    }
    match store.persist(event).await {
        Ok(()) => debug!("{} persisted {}", store.name(), event.kind()),
        Err(e) => error!("{} failed to persist {}: {:#}", store.name(), event.kind(), e),
    }
}

/// Persists position-open, position-close and trade events from `bus`.
///
/// Failures are logged and never reach the ledger. On shutdown, events
/// already published are drained before the worker exits.
pub fn spawn_trade_store_worker(
    bus: &EventBus,
    store: Arc<dyn TradeStore>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        info!("trade store '{}' started", store.name());
        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Ok(event) => store_event(store.as_ref(), &event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("trade store lagged, {} events lost", skipped)
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = shutdown.recv() => {
                    loop {
                        match rx.try_recv() {
                            Ok(event) => store_event(store.as_ref(), &event).await,
                            Err(TryRecvError::Lagged(skipped)) => {
                                warn!("trade store lagged, {} events lost", skipped)
                            }
                            Err(_) => break,
                        }
                    }
                    break;
                }
            }
        }
        info!("trade store '{}' stopped", store.name());
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quant_pilot_domain::{CloseReason, ClosedTrade, Instrument, OrderSide};
    use std::sync::Mutex;

    fn trade() -> ClosedTrade {
        ClosedTrade {
            position_id: "pos_1".to_string(),
            instrument: Instrument::new("BTC/USDT").unwrap(),
            side: OrderSide::Buy,
            entry_price: 100.0,
            exit_price: 102.0,
            quantity: 1.0,
            realized_pnl: 2.0,
            reason: CloseReason::TakeProfit,
            opened_at: Utc::now(),
            closed_at: Utc::now(),
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        kinds: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TradeStore for MemoryStore {
        fn name(&self) -> &str {
            "memory"
        }

        async fn persist(&self, event: &EngineEvent) -> Result<()> {
            self.kinds.lock().unwrap().push(event.kind().to_string());
            Ok(())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl TradeStore for FailingStore {
        fn name(&self) -> &str {
            "failing"
        }

        async fn persist(&self, _event: &EngineEvent) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[tokio::test]
    async fn test_jsonl_appends_lines() {
        let path = std::env::temp_dir()
            .join(format!("quant-pilot-{}", uuid::Uuid::new_v4()))
            .join("trades.jsonl");
        let store = JsonlTradeStore::new(&path);
        store.persist(&EngineEvent::TradeRecorded(trade())).await.unwrap();
        store.persist(&EngineEvent::PositionClosed(trade())).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "trade_recorded");
        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_worker_persists_only_persistable_and_drains_on_shutdown() {
        let bus = EventBus::default();
        let store = Arc::new(MemoryStore::default());
        let (stop_tx, stop_rx) = broadcast::channel(1);
        let worker = spawn_trade_store_worker(&bus, store.clone(), stop_rx);

        bus.publish(EngineEvent::error("test", "ignored"));
        bus.publish(EngineEvent::TradeRecorded(trade()));
        bus.publish(EngineEvent::PositionClosed(trade()));
        stop_tx.send(()).unwrap();
        worker.await.unwrap();

        let kinds = store.kinds.lock().unwrap().clone();
        assert_eq!(kinds, vec!["trade_recorded", "position_closed"]);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_worker() {
        let bus = EventBus::default();
        let (stop_tx, stop_rx) = broadcast::channel(1);
        let worker = spawn_trade_store_worker(&bus, Arc::new(FailingStore), stop_rx);
        bus.publish(EngineEvent::TradeRecorded(trade()));
        bus.publish(EngineEvent::TradeRecorded(trade()));
        stop_tx.send(()).unwrap();
        assert!(worker.await.is_ok());
    }
}
