//! Websocket ticker feed
//!
//! Expects JSON text frames `{"instrument": "BTC/USDT", "price": 101.5, "volume": 3.2}`.
//! On connect a subscribe frame listing the tracked instruments is sent.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use quant_pilot_domain::Instrument;

use super::ticker::{StreamError, Tick, TickStream, TickerSource};

pub struct WebsocketTickerSource {
    url: String,
    instruments: Vec<Instrument>,
}

impl WebsocketTickerSource {
    pub fn new(url: impl Into<String>, instruments: Vec<Instrument>) -> Self {
        Self {
            url: url.into(),
            instruments,
        }
    }

    fn subscribe_frame(&self) -> String {
        let symbols: Vec<&str> = self.instruments.iter().map(|i| i.symbol()).collect();
        json!({ "op": "subscribe", "instruments": symbols }).to_string()
    }
}

/// Parses one text frame; non-tick frames (acks, heartbeats) yield `None`
pub fn parse_tick_frame(text: &str) -> Option<Result<Tick, StreamError>> {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => return Some(Err(StreamError::Malformed(e.to_string()))),
    };
    if value.get("price").is_none() {
        debug!("ignoring non-tick frame: {}", text);
        return None;
    }
    Some(serde_json::from_value(value).map_err(|e| StreamError::Malformed(e.to_string())))
}

#[async_trait]
impl TickerSource for WebsocketTickerSource {
    fn name(&self) -> &str {
        "websocket"
    }

    async fn connect(&self) -> Result<TickStream, StreamError> {
        let (mut ws, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| StreamError::Connect(e.to_string()))?;
        ws.send(Message::Text(self.subscribe_frame()))
            .await
            .map_err(|e| StreamError::Connect(e.to_string()))?;
        info!("ticker websocket connected: {}", self.url);

        let stream = ws.filter_map(|msg| async move {
            match msg {
                Ok(Message::Text(text)) => parse_tick_frame(&text),
                Ok(Message::Close(frame)) => {
                    debug!("ticker websocket closed by peer: {:?}", frame);
                    None
                }
                Ok(_) => None,
                Err(e) => Some(Err(StreamError::Transport(e.to_string()))),
            }
        });
        Ok(Box::pin(stream))
    }
}
