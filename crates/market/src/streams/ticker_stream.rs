use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{broadcast, mpsc};
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;
use tracing::{debug, info, warn};

use super::ticker::{Tick, TickStream, TickerSource};
use crate::cache::MarketDataCache;

enum StreamEnd {
    Shutdown,
    Dropped,
}

/// Ingests ticks until shutdown.
///
/// Connects through `source`, retrying every `reconnect` without limit. Each
/// tick is written into `cache` and forwarded on `ticks` with `try_send`, so a
/// busy consumer never stalls the feed (the tick is still in the cache). When
/// the stream ends or errors the loop waits `reconnect` and connects again.
pub async fn run_ticker_stream(
    source: Arc<dyn TickerSource>,
    cache: Arc<MarketDataCache>,
    ticks: mpsc::Sender<Tick>,
    reconnect: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    info!("ticker stream '{}' starting", source.name());
    let interval_ms = reconnect.as_millis().max(1) as u64;

    loop {
        let connect = Retry::spawn(FixedInterval::from_millis(interval_ms), || {
            let source = source.clone();
            async move {
                source.connect().await.map_err(|e| {
                    warn!("ticker stream '{}' connect failed: {}", source.name(), e);
                    e
                })
            }
        });

        let stream = tokio::select! {
            _ = shutdown.recv() => break,
            connected = connect => match connected {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("ticker stream '{}' gave up connecting: {}", source.name(), e);
                    continue;
                }
            },
        };

        match consume(stream, &cache, &ticks, &mut shutdown).await {
            StreamEnd::Shutdown => break,
            StreamEnd::Dropped => {
                warn!(
                    "ticker stream '{}' dropped, reconnecting in {:?}",
                    source.name(),
                    reconnect
                );
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = tokio::time::sleep(reconnect) => {}
                }
            }
        }
    }
    info!("ticker stream '{}' stopped", source.name());
}

async fn consume(
    mut stream: TickStream,
    cache: &MarketDataCache,
    ticks: &mpsc::Sender<Tick>,
    shutdown: &mut broadcast::Receiver<()>,
) -> StreamEnd {
    loop {
        tokio::select! {
            _ = shutdown.recv() => return StreamEnd::Shutdown,
            item = stream.next() => match item {
                Some(Ok(tick)) => {
                    if let Err(e) = cache.apply_tick(&tick.instrument, tick.price, tick.volume, tick.timestamp) {
                        debug!("tick ignored: {}", e);
                        continue;
                    }
                    if let Err(e) = ticks.try_send(tick) {
                        debug!("tick not forwarded: {}", e);
                    }
                }
                Some(Err(e)) => {
                    warn!("ticker stream error: {}", e);
                    return StreamEnd::Dropped;
                }
                None => return StreamEnd::Dropped,
            },
        }
    }
}
