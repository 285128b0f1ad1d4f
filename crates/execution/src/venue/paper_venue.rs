use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, DurationRound, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use quant_pilot_domain::{
    AccountInfo, Candle, Instrument, MarketVenue, OrderRequest, OrderResult, OrderSide,
    OrderStatus, OrderType, Quote, VenueError, VenuePosition,
};
use quant_pilot_trading::OrderStateMachine;

/// Seed price for instruments without a configured one
pub const DEFAULT_SEED_PRICE: f64 = 100.0;
/// Largest relative move of one random-walk step
pub const MAX_STEP: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct PaperVenueConfig {
    pub initial_cash: f64,
    pub slippage_bps: f64,
    /// Relative size of one random-walk step, clamped to [`MAX_STEP`]
    pub step_volatility: f64,
    pub seed_prices: HashMap<Instrument, f64>,
    /// Fixed RNG seed for reproducible runs
    pub rng_seed: Option<u64>,
}

impl Default for PaperVenueConfig {
    fn default() -> Self {
        Self {
            initial_cash: 10_000.0,
            slippage_bps: 5.0,
            step_volatility: 0.002,
            seed_prices: HashMap::new(),
            rng_seed: None,
        }
    }
}

struct PaperOrder {
    request: OrderRequest,
    state: OrderStateMachine,
    filled_price: Option<f64>,
}

#[derive(Default)]
struct Holding {
    /// Signed: negative when short
    quantity: f64,
    average_price: f64,
}

struct Book {
    prices: HashMap<Instrument, f64>,
    cash: f64,
    holdings: HashMap<Instrument, Holding>,
    orders: HashMap<String, PaperOrder>,
    next_order: u64,
    rng: StdRng,
}

impl Book {
    fn price_or_seed(&mut self, instrument: &Instrument) -> f64 {
        *self
            .prices
            .entry(instrument.clone())
            .or_insert(DEFAULT_SEED_PRICE)
    }

    fn step(&mut self, instrument: &Instrument, step_volatility: f64) -> f64 {
        let step = step_volatility.clamp(0.0, MAX_STEP);
        let shock: f64 = self.rng.gen_range(-1.0..=1.0);
        let price = self.price_or_seed(instrument) * (1.0 + step * shock);
        self.prices.insert(instrument.clone(), price);
        price
    }

    fn next_order_id(&mut self) -> String {
        self.next_order += 1;
        format!("paper-{}", self.next_order)
    }

    fn apply_fill(&mut self, instrument: &Instrument, side: OrderSide, price: f64, quantity: f64) {
        let signed = side.sign() * quantity;
        self.cash -= signed * price;

        let holding = self.holdings.entry(instrument.clone()).or_default();
        let new_quantity = holding.quantity + signed;
        if holding.quantity == 0.0 || holding.quantity.signum() != new_quantity.signum() {
            holding.average_price = price;
        } else if holding.quantity.signum() == signed.signum() {
            holding.average_price = (holding.average_price * holding.quantity.abs()
                + price * quantity)
                / new_quantity.abs();
        }
        holding.quantity = new_quantity;
        if holding.quantity.abs() < 1e-12 {
            self.holdings.remove(instrument);
        }
    }
}

/// In-memory venue for paper trading.
///
/// Prices follow a bounded random walk that advances on every quote. Market
/// orders fill immediately at the last price plus slippage against the
/// taker. Stop-loss and take-profit orders rest until cancelled.
pub struct PaperVenue {
    slippage_bps: f64,
    step_volatility: f64,
    book: Mutex<Book>,
}

impl PaperVenue {
    pub fn new(config: PaperVenueConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let prices = config
            .seed_prices
            .into_iter()
            .filter(|(_, p)| p.is_finite() && *p > 0.0)
            .collect();
        Self {
            slippage_bps: config.slippage_bps.max(0.0),
            step_volatility: config.step_volatility,
            book: Mutex::new(Book {
                prices,
                cash: config.initial_cash,
                holdings: HashMap::new(),
                orders: HashMap::new(),
                next_order: 0,
                rng,
            }),
        }
    }

    fn book(&self) -> std::sync::MutexGuard<'_, Book> {
        self.book.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Overrides the current price, e.g. to replay a scenario
    pub fn set_price(&self, instrument: &Instrument, price: f64) {
        self.book().prices.insert(instrument.clone(), price);
    }

    pub fn last_price(&self, instrument: &Instrument) -> Option<f64> {
        self.book().prices.get(instrument).copied()
    }

    pub fn order_status(&self, order_id: &str) -> Option<OrderStatus> {
        self.book().orders.get(order_id).map(|o| o.state.state())
    }

    /// Resting orders, i.e. submitted but neither filled nor cancelled
    pub fn open_order_ids(&self) -> Vec<String> {
        let book = self.book();
        let mut ids: Vec<String> = book
            .orders
            .iter()
            .filter(|(_, o)| !o.state.state().is_terminal())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn slipped(&self, price: f64, side: OrderSide) -> f64 {
        price * (1.0 + side.sign() * self.slippage_bps / 10_000.0)
    }

    fn is_marketable(request: &OrderRequest, market: f64) -> bool {
        match (request.order_type, request.price) {
            (OrderType::Market, _) => true,
            (OrderType::Limit, Some(limit)) => match request.side {
                OrderSide::Buy => market <= limit,
                OrderSide::Sell => market >= limit,
            },
            _ => false,
        }
    }
}

/// `5m`, `1h`, `1d` style timeframe
fn parse_timeframe(timeframe: &str) -> Result<Duration, VenueError> {
    let timeframe = timeframe.trim();
    let invalid = || VenueError::InvalidRequest(format!("unsupported timeframe '{}'", timeframe));
    let split = timeframe.len().checked_sub(1).ok_or_else(invalid)?;
    if !timeframe.is_char_boundary(split) {
        return Err(invalid());
    }
    let (amount, unit) = timeframe.split_at(split);
    let amount: i64 = amount.parse().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }
    match unit {
        "m" => Ok(Duration::minutes(amount)),
        "h" | "H" => Ok(Duration::hours(amount)),
        "d" | "D" => Ok(Duration::days(amount)),
        _ => Err(invalid()),
    }
}

#[async_trait]
impl MarketVenue for PaperVenue {
    fn name(&self) -> &str {
        "paper"
    }

    async fn fetch_snapshot(&self, instrument: &Instrument) -> Result<Quote, VenueError> {
        let mut book = self.book();
        let price = book.step(instrument, self.step_volatility);
        let volume = book.rng.gen_range(10.0..1_000.0);
        let half_spread = price * self.slippage_bps / 20_000.0;
        Ok(Quote {
            instrument: instrument.clone(),
            price,
            volume,
            bid: Some(price - half_spread),
            ask: Some(price + half_spread),
            timestamp: Utc::now(),
        })
    }

    /// Synthetic history ending at the current price, oldest first
    async fn fetch_candles(
        &self,
        instrument: &Instrument,
        timeframe: &str,
        count: usize,
    ) -> Result<Vec<Candle>, VenueError> {
        let interval = parse_timeframe(timeframe)?;
        let end: DateTime<Utc> = Utc::now()
            .duration_trunc(interval)
            .map_err(|e| VenueError::InvalidRequest(e.to_string()))?;

        let mut book = self.book();
        let step = self.step_volatility.clamp(0.0, MAX_STEP);
        let mut close = book.price_or_seed(instrument);
        let mut candles = Vec::with_capacity(count);
        for i in 0..count {
            let open = close / (1.0 + step * book.rng.gen_range(-1.0..=1.0));
            let wick = 1.0 + step * book.rng.gen_range(0.0..=0.5);
            let volume = book.rng.gen_range(10.0..1_000.0);
            candles.push(Candle {
                timestamp: end - interval * i as i32,
                open,
                high: open.max(close) * wick,
                low: open.min(close) / wick,
                close,
                volume,
            });
            close = open;
        }
        candles.reverse();
        debug!("{}: generated {} {} candles", instrument, candles.len(), timeframe);
        Ok(candles)
    }

    async fn place_order(&self, request: OrderRequest) -> Result<OrderResult, VenueError> {
        if !(request.quantity.is_finite() && request.quantity > 0.0) {
            return Err(VenueError::InvalidRequest(format!(
                "quantity must be positive, got {}",
                request.quantity
            )));
        }
        if request.order_type != OrderType::Market && request.price.is_none() {
            return Err(VenueError::InvalidRequest(format!(
                "{} order requires a price",
                request.order_type.as_str()
            )));
        }

        let mut book = self.book();
        let market = book.price_or_seed(&request.instrument);
        let id = book.next_order_id();
        let mut state = OrderStateMachine::new();
        let transition = |e: quant_pilot_trading::TransitionError| {
            VenueError::InvalidRequest(e.to_string())
        };
        state.submit().map_err(transition)?;

        if !Self::is_marketable(&request, market) {
            debug!(
                "resting {} {} {} {} @ {:?}",
                id,
                request.order_type.as_str(),
                request.side,
                request.instrument,
                request.price
            );
            book.orders.insert(
                id.clone(),
                PaperOrder {
                    request,
                    state,
                    filled_price: None,
                },
            );
            return Ok(OrderResult {
                id,
                status: OrderStatus::Submitted,
                filled_price: None,
                filled_quantity: 0.0,
            });
        }

        let price = self.slipped(market, request.side);
        let held = book
            .holdings
            .get(&request.instrument)
            .map_or(0.0, |h| h.quantity);
        let opens_long = request.side == OrderSide::Buy && held >= 0.0;
        if opens_long && price * request.quantity > book.cash {
            state.reject().map_err(transition)?;
            let reason = format!(
                "insufficient buying power: {:.2} needed, {:.2} available",
                price * request.quantity,
                book.cash
            );
            book.orders.insert(
                id,
                PaperOrder {
                    request,
                    state,
                    filled_price: None,
                },
            );
            return Err(VenueError::OrderRejected(reason));
        }

        state.fill().map_err(transition)?;
        book.apply_fill(&request.instrument, request.side, price, request.quantity);
        info!(
            "paper fill {}: {} {} {} @ {:.4}",
            id, request.side, request.quantity, request.instrument, price
        );
        let quantity = request.quantity;
        book.orders.insert(
            id.clone(),
            PaperOrder {
                request,
                state,
                filled_price: Some(price),
            },
        );
        Ok(OrderResult {
            id,
            status: OrderStatus::Filled,
            filled_price: Some(price),
            filled_quantity: quantity,
        })
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), VenueError> {
        let mut book = self.book();
        let order = book
            .orders
            .get_mut(order_id)
            .ok_or_else(|| VenueError::UnknownOrder(order_id.to_string()))?;
        order
            .state
            .cancel()
            .map_err(|e| VenueError::InvalidRequest(e.to_string()))?;
        debug!(
            "cancelled {} ({} {}, filled at {:?})",
            order_id,
            order.request.order_type.as_str(),
            order.request.instrument,
            order.filled_price
        );
        Ok(())
    }

    async fn get_account(&self) -> Result<AccountInfo, VenueError> {
        let book = self.book();
        let mut positions: Vec<VenuePosition> = book
            .holdings
            .iter()
            .map(|(instrument, h)| VenuePosition {
                instrument: instrument.clone(),
                side: if h.quantity >= 0.0 {
                    OrderSide::Buy
                } else {
                    OrderSide::Sell
                },
                quantity: h.quantity.abs(),
                average_price: h.average_price,
            })
            .collect();
        positions.sort_by(|a, b| a.instrument.cmp(&b.instrument));
        Ok(AccountInfo {
            cash: book.cash,
            buying_power: book.cash.max(0.0),
            positions,
        })
    }
}
