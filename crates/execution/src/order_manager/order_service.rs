use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use quant_pilot_domain::{Fill, MarketVenue, OrderRequest, OrderResult, Position, Signal};

use crate::error::ExecutionError;

/// Turns approved signals into venue orders.
///
/// Protective stop-loss/take-profit order ids are tracked per position and
/// cancelled when the position is closed through this service.
pub struct OrderService {
    venue: Arc<dyn MarketVenue>,
    place_protective_orders: bool,
    protective_orders: Mutex<HashMap<String, Vec<String>>>,
}

impl OrderService {
    pub fn new(venue: Arc<dyn MarketVenue>, place_protective_orders: bool) -> Self {
        Self {
            venue,
            place_protective_orders,
            protective_orders: Mutex::new(HashMap::new()),
        }
    }

    pub fn venue(&self) -> &Arc<dyn MarketVenue> {
        &self.venue
    }

    fn filled(result: OrderResult, requested: f64) -> Result<(String, f64, f64), ExecutionError> {
        match result.filled_price {
            Some(price) if result.is_filled() => {
                let quantity = if result.filled_quantity > 0.0 {
                    result.filled_quantity
                } else {
                    requested
                };
                Ok((result.id, price, quantity))
            }
            _ => Err(ExecutionError::NotFilled {
                order_id: result.id,
                status: result.status,
            }),
        }
    }

    /// Market order for the signal's side; the fill carries the signal's
    /// protective levels
    pub async fn execute_entry(&self, signal: &Signal, quantity: f64) -> Result<Fill, ExecutionError> {
        if !(quantity.is_finite() && quantity > 0.0) {
            return Err(ExecutionError::InvalidQuantity(quantity));
        }
        let result = self
            .venue
            .place_order(OrderRequest::market(
                signal.instrument.clone(),
                signal.action,
                quantity,
            ))
            .await?;
        let (order_id, price, filled_quantity) = Self::filled(result, quantity)?;
        info!(
            "{} {} {} {} filled @ {} (order {})",
            signal.id, signal.action, filled_quantity, signal.instrument, price, order_id
        );
        Ok(Fill::from_signal(order_id, signal, price, filled_quantity))
    }

    /// Places resting stop-loss and take-profit orders for `position` when
    /// enabled. Failures are logged; the position stays open either way.
    pub async fn place_protective_orders(&self, position: &Position) -> Vec<String> {
        if !self.place_protective_orders {
            return Vec::new();
        }
        let exit_side = position.side.opposite();
        let requests = [
            OrderRequest::stop_loss(
                position.instrument.clone(),
                exit_side,
                position.quantity,
                position.stop_loss,
            ),
            OrderRequest::take_profit(
                position.instrument.clone(),
                exit_side,
                position.quantity,
                position.take_profit,
            ),
        ];

        let mut ids = Vec::with_capacity(requests.len());
        for request in requests {
            let kind = request.order_type.as_str();
            match self.venue.place_order(request).await {
                Ok(result) => {
                    debug!("{}: {} order {} placed", position.id, kind, result.id);
                    ids.push(result.id);
                }
                Err(e) => warn!("{}: {} order failed: {}", position.id, kind, e),
            }
        }
        if !ids.is_empty() {
            self.protective_orders
                .lock()
                .await
                .insert(position.id.clone(), ids.clone());
        }
        ids
    }

    pub async fn protective_order_ids(&self, position_id: &str) -> Vec<String> {
        self.protective_orders
            .lock()
            .await
            .get(position_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Best-effort cancel of the position's resting protective orders
    pub async fn cancel_protective_orders(&self, position_id: &str) {
        let ids = self.protective_orders.lock().await.remove(position_id);
        for id in ids.unwrap_or_default() {
            if let Err(e) = self.venue.cancel_order(&id).await {
                warn!("{}: cancel of protective order {} failed: {}", position_id, id, e);
            }
        }
    }

    /// Flattens `position` with a market order and returns the exit price
    pub async fn close_at_market(&self, position: &Position) -> Result<f64, ExecutionError> {
        self.cancel_protective_orders(&position.id).await;
        let result = self
            .venue
            .place_order(OrderRequest::market(
                position.instrument.clone(),
                position.side.opposite(),
                position.quantity,
            ))
            .await?;
        let (order_id, price, _) = Self::filled(result, position.quantity)?;
        info!(
            "{} closed at market @ {} (order {}, held {}s)",
            position.id,
            price,
            order_id,
            (Utc::now() - position.opened_at).num_seconds()
        );
        Ok(price)
    }
}
