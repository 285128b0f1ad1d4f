use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use quant_pilot_analytics::PerformanceMetrics;
use quant_pilot_core::{AppConfig, AppError, AppResult};
use quant_pilot_domain::{
    CloseReason, EngineEvent, EventBus, Instrument, MarketVenue, Position, Predictor, Signal,
};
use quant_pilot_execution::OrderService;
use quant_pilot_market::{run_ticker_stream, MarketDataCache, Tick, TickerSource};
use quant_pilot_risk::{CorrelationPolicy, RiskDecision, RiskGate, RiskState};
use quant_pilot_strategies::{StrategyManager, StrategyRegistry};
use quant_pilot_trading::{LedgerSnapshot, PortfolioLedger};

use super::market_hours::MarketHours;
use super::status::{EngineState, EngineStatus, ExecutionReport, LiquidationReport, ScanReport};
use crate::scheduler::TaskScheduler;

const TICK_CHANNEL_CAPACITY: usize = 1024;

/// Runs the trading pipeline: scan → risk gate → queue → execution → ledger.
///
/// Three periodic cycles share the engine behind an `Arc`:
///
/// * scan: refresh market data, run the strategies, gate and queue signals
/// * execution: mark open positions to market, close triggered exits, drain
///   the signal queue in FIFO order
/// * performance: recompute metrics and let the risk gate adapt
///
/// A cycle that is still running when its next tick fires is skipped for that
/// tick. Cycles do nothing unless the engine is RUNNING.
pub struct TradingEngine {
    config: AppConfig,
    instruments: Vec<Instrument>,
    venue: Arc<dyn MarketVenue>,
    predictor: Option<Arc<dyn Predictor>>,
    cache: Arc<MarketDataCache>,
    strategies: StrategyManager,
    risk_gate: RiskGate,
    risk_state: Mutex<RiskState>,
    ledger: Mutex<PortfolioLedger>,
    orders: OrderService,
    queue: Mutex<VecDeque<Signal>>,
    events: EventBus,
    market_hours: MarketHours,
    state: Mutex<EngineState>,
    scheduler: Mutex<Option<TaskScheduler>>,
    scan_guard: Mutex<()>,
    execution_guard: Mutex<()>,
    performance_guard: Mutex<()>,
    stream_shutdown: broadcast::Sender<()>,
    ticks_received: AtomicU64,
}

impl TradingEngine {
    /// Builds the engine from a validated configuration.
    ///
    /// Unknown instruments or strategy names are configuration errors; the
    /// engine is created STOPPED.
    pub fn new(
        config: AppConfig,
        venue: Arc<dyn MarketVenue>,
        predictor: Option<Arc<dyn Predictor>>,
        events: EventBus,
    ) -> AppResult<Self> {
        config.validate()?;

        let instruments = config
            .instruments
            .iter()
            .map(|symbol| {
                Instrument::new(symbol)
                    .map_err(|e| AppError::Config(format!("instrument '{}': {}", symbol, e)))
            })
            .collect::<AppResult<Vec<_>>>()?;

        let registry = StrategyRegistry::from_names(&config.strategies, &config.signal)
            .map_err(|e| AppError::Config(e.to_string()))?;
        let strategies = StrategyManager::new(Arc::new(registry));
        if strategies.needs_forecast() && predictor.is_none() {
            warn!("forecast-driven strategies configured without a predictor; they will not fire");
        }

        let cache = Arc::new(MarketDataCache::new(
            &instruments,
            config.market_data.candle_window,
        ));
        let risk_gate = RiskGate::new(config.risk.clone());
        let risk_state = risk_gate.new_state(config.initial_balance);
        let ledger = PortfolioLedger::new(config.account_currency.clone(), config.initial_balance)
            .with_event_bus(events.clone());
        let orders = OrderService::new(venue.clone(), config.venue.place_protective_orders);
        let market_hours = MarketHours::new(config.domain);
        let (stream_shutdown, _) = broadcast::channel(4);

        info!(
            "engine configured: {} mode, {} instruments on '{}', strategies {:?}",
            config.mode,
            instruments.len(),
            venue.name(),
            config.strategies
        );

        Ok(Self {
            config,
            instruments,
            venue,
            predictor,
            cache,
            strategies,
            risk_gate,
            risk_state: Mutex::new(risk_state),
            ledger: Mutex::new(ledger),
            orders,
            queue: Mutex::new(VecDeque::new()),
            events,
            market_hours,
            state: Mutex::new(EngineState::Stopped),
            scheduler: Mutex::new(None),
            scan_guard: Mutex::new(()),
            execution_guard: Mutex::new(()),
            performance_guard: Mutex::new(()),
            stream_shutdown,
            ticks_received: AtomicU64::new(0),
        })
    }

    /// Replaces the correlation estimator; only meaningful before `start`
    pub fn with_correlation_policy(mut self, policy: Arc<dyn CorrelationPolicy>) -> Self {
        self.risk_gate = self.risk_gate.with_correlation_policy(policy);
        self
    }

    /// Resumes from a persisted ledger; only meaningful before `start`
    pub async fn restore_ledger(&self, snapshot: LedgerSnapshot) {
        let equity = {
            let mut ledger = self.ledger.lock().await;
            ledger.import_state(snapshot);
            ledger.equity()
        };
        self.risk_state.lock().await.update_balance(equity);
        info!("ledger restored, equity {:.2}", equity);
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn cache(&self) -> &Arc<MarketDataCache> {
        &self.cache
    }

    pub async fn state(&self) -> EngineState {
        *self.state.lock().await
    }

    async fn is_running(&self) -> bool {
        self.state().await == EngineState::Running
    }

    /// STOPPED → RUNNING: one immediate scan, then the periodic cycles.
    ///
    /// A `stop()` that lands during the initial scan wins: no cycles are
    /// scheduled and start-up reports an error.
    pub async fn start(self: &Arc<Self>) -> AppResult<()> {
        {
            let mut state = self.state.lock().await;
            if *state != EngineState::Stopped {
                return Err(AppError::Other(format!("engine is {}", *state)));
            }
            *state = EngineState::Running;
        }
        info!("engine starting");

        let leftover = self.scheduler.lock().await.take();
        if let Some(scheduler) = leftover {
            warn!("shutting down cycles left from a previous run");
            scheduler.shutdown().await;
        }

        let report = self.scan_cycle().await;
        info!(
            "initial scan: {} generated, {} queued, {} rejected",
            report.generated, report.queued, report.rejected
        );

        // held until the scheduler is stored so stop() cannot slip in between
        let mut state = self.state.lock().await;
        if *state != EngineState::Running {
            info!("engine {} during start-up, cycles not scheduled", *state);
            return Err(AppError::Other(format!("engine {} during start-up", *state)));
        }
        match self.schedule_cycles() {
            Ok(scheduler) => {
                *self.scheduler.lock().await = Some(scheduler);
                info!("engine running");
                Ok(())
            }
            Err(e) => {
                *state = EngineState::Stopped;
                Err(AppError::Other(format!("scheduling failed: {:#}", e)))
            }
        }
    }

    fn schedule_cycles(self: &Arc<Self>) -> anyhow::Result<TaskScheduler> {
        let schedule = &self.config.schedule;
        let scan_every = Duration::from_secs(schedule.scan_interval_secs.max(1));
        let execution_every = Duration::from_secs(schedule.execution_interval_secs.max(1));
        let performance_every = Duration::from_secs(schedule.performance_interval_secs.max(1));

        let mut scheduler = TaskScheduler::new();

        let engine = Arc::clone(self);
        scheduler.add_periodic_task("scan", scan_every, scan_every, move || {
            let engine = engine.clone();
            async move {
                engine.scan_cycle().await;
            }
        })?;

        let engine = Arc::clone(self);
        scheduler.add_periodic_task("execution", execution_every, execution_every, move || {
            let engine = engine.clone();
            async move {
                engine.execution_cycle().await;
            }
        })?;

        let engine = Arc::clone(self);
        scheduler.add_periodic_task(
            "performance",
            performance_every,
            performance_every,
            move || {
                let engine = engine.clone();
                async move {
                    engine.performance_cycle().await;
                }
            },
        )?;

        Ok(scheduler)
    }

    /// RUNNING → STOPPING → STOPPED.
    ///
    /// Stops the cycles and the ticker feed, drops queued signals and closes
    /// every open position at market. Liquidation is best effort: a failed
    /// close is logged and counted, never retried.
    pub async fn stop(&self) -> LiquidationReport {
        {
            let mut state = self.state.lock().await;
            if *state != EngineState::Running {
                info!("stop requested while {}", *state);
                return LiquidationReport::default();
            }
            *state = EngineState::Stopping;
        }
        info!("engine stopping");

        let _ = self.stream_shutdown.send(());
        let scheduler = self.scheduler.lock().await.take();
        if let Some(scheduler) = scheduler {
            scheduler.shutdown().await;
        }
        // a cycle called directly may still be in flight
        let _scan = self.scan_guard.lock().await;
        let _execution = self.execution_guard.lock().await;

        let dropped_signals = {
            let mut queue = self.queue.lock().await;
            let dropped = queue.len();
            queue.clear();
            dropped
        };
        if dropped_signals > 0 {
            info!("dropped {} queued signals", dropped_signals);
        }

        let mut report = self.liquidate_all().await;
        report.dropped_signals = dropped_signals;

        *self.state.lock().await = EngineState::Stopped;
        info!(
            "engine stopped: {} positions closed, {} failed",
            report.closed, report.failed
        );
        report
    }

    /// Closes every open position at market
    pub async fn liquidate_all(&self) -> LiquidationReport {
        let mut report = LiquidationReport::default();
        let open = self.ledger.lock().await.open_positions();
        if open.is_empty() {
            return report;
        }
        warn!("liquidating {} open positions", open.len());

        for position in open {
            match self.close_at_market(&position, CloseReason::Liquidation).await {
                Ok(()) => report.closed += 1,
                Err(e) => {
                    report.failed += 1;
                    error!("{}: liquidation failed: {:#}", position.id, e);
                    self.events
                        .publish(EngineEvent::error(format!("liquidate {}", position.id), format!("{:#}", e)));
                }
            }
        }
        report
    }

    async fn close_at_market(&self, position: &Position, reason: CloseReason) -> anyhow::Result<()> {
        let exit_price = self.orders.close_at_market(position).await?;
        self.ledger
            .lock()
            .await
            .close_position(&position.id, Some(exit_price), reason)?;
        Ok(())
    }

    /// Refreshes market data and gates new signals into the queue
    pub async fn scan_cycle(&self) -> ScanReport {
        let mut report = ScanReport::default();
        let Ok(_guard) = self.scan_guard.try_lock() else {
            debug!("scan cycle still running, skipping tick");
            report.skipped = true;
            return report;
        };
        if !self.is_running().await {
            report.skipped = true;
            return report;
        }
        if !self.market_hours.is_open(Utc::now()) {
            debug!("market closed, scan skipped");
            report.skipped = true;
            return report;
        }

        for instrument in &self.instruments {
            report.instruments += 1;
            if let Err(e) = self.scan_instrument(instrument, &mut report).await {
                report.failed += 1;
                warn!("scan of {} failed: {:#}", instrument, e);
                self.events
                    .publish(EngineEvent::error(format!("scan {}", instrument), format!("{:#}", e)));
            }
        }

        info!(
            "scan: {} instruments, {} signals, {} queued, {} rejected, {} failed",
            report.instruments, report.generated, report.queued, report.rejected, report.failed
        );
        report
    }

    async fn scan_instrument(&self, instrument: &Instrument, report: &mut ScanReport) -> anyhow::Result<()> {
        self.refresh_market_data(instrument).await?;
        let snapshot = self
            .cache
            .snapshot(instrument)
            .filter(|s| s.has_price())
            .ok_or_else(|| anyhow!("no market data for {}", instrument))?;

        let forecast = match (&self.predictor, self.strategies.needs_forecast()) {
            (Some(predictor), true) => {
                let window = self.cache.feature_window(instrument);
                let forecast = predictor
                    .predict(instrument, &window)
                    .await
                    .with_context(|| format!("predictor '{}'", predictor.name()))?;
                trace!("{}: forecast {:?}", instrument, forecast);
                Some(forecast)
            }
            _ => None,
        };

        let run = self.strategies.run_all(&snapshot, forecast.as_ref());
        for (strategy, e) in &run.failures {
            self.events.publish(EngineEvent::error(
                format!("strategy {} on {}", strategy, instrument),
                e,
            ));
        }
        for signal in run.signals {
            report.generated += 1;
            self.admit_signal(signal, report).await;
        }
        Ok(())
    }

    /// Venue quote and candles into the cache. An unavailable venue leaves the
    /// cached data in place.
    async fn refresh_market_data(&self, instrument: &Instrument) -> anyhow::Result<()> {
        match self.venue.fetch_snapshot(instrument).await {
            Ok(quote) => self.cache.apply_quote(&quote)?,
            Err(e) => warn!("{}: quote unavailable, using cached data: {}", instrument, e),
        }

        let fetched = self
            .venue
            .fetch_candles(
                instrument,
                &self.config.signal.timeframe,
                self.config.market_data.candle_fetch_count,
            )
            .await;
        match fetched {
            Ok(candles) => self.cache.apply_candles(instrument, &candles)?,
            Err(e) => warn!("{}: candles unavailable: {}", instrument, e),
        }
        Ok(())
    }

    async fn admit_signal(&self, signal: Signal, report: &mut ScanReport) {
        let duplicate = self
            .queue
            .lock()
            .await
            .iter()
            .any(|q| q.instrument == signal.instrument && q.action == signal.action);
        if duplicate {
            debug!("{} {} already queued", signal.action, signal.instrument);
            report.duplicates += 1;
            return;
        }

        let open = self.ledger.lock().await.open_positions();
        let decision = {
            let mut risk = self.risk_state.lock().await;
            self.risk_gate.validate(&signal, &mut risk, &open)
        };
        match decision {
            RiskDecision::Approved => {
                self.queue.lock().await.push_back(signal.clone());
                report.queued += 1;
                self.events.publish(EngineEvent::SignalGenerated(signal));
            }
            RiskDecision::Rejected(reason) => {
                report.rejected += 1;
                self.events.publish(EngineEvent::SignalRejected {
                    signal_id: signal.id,
                    instrument: signal.instrument,
                    reason: reason.to_string(),
                });
            }
        }
    }

    /// Marks positions to market, then executes queued signals FIFO
    pub async fn execution_cycle(&self) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        let Ok(_guard) = self.execution_guard.try_lock() else {
            debug!("execution cycle still running, skipping tick");
            report.skipped = true;
            return report;
        };
        if !self.is_running().await {
            report.skipped = true;
            return report;
        }

        report.protective_closes = self.mark_to_market().await;

        if self.market_hours.is_open(Utc::now()) {
            let signals: Vec<Signal> = self.queue.lock().await.drain(..).collect();
            for signal in signals {
                self.execute_signal(signal, &mut report).await;
            }
        } else {
            debug!("market closed, queued signals held");
        }

        let equity = self.ledger.lock().await.equity();
        self.risk_state.lock().await.update_balance(equity);

        if report.executed + report.expired + report.failed + report.protective_closes > 0 {
            info!(
                "execution: {} executed, {} expired, {} unsized, {} failed, {} exits",
                report.executed,
                report.expired,
                report.zero_size,
                report.failed,
                report.protective_closes
            );
        }
        report
    }

    /// Refreshes prices of instruments with open positions. Triggered stops
    /// and targets are flattened at the venue and closed in the ledger at the
    /// venue's fill; the rest are marked. Returns the number of closes.
    async fn mark_to_market(&self) -> usize {
        let open = self.ledger.lock().await.open_positions();
        if open.is_empty() {
            return 0;
        }

        let mut held: Vec<Instrument> = open.iter().map(|p| p.instrument.clone()).collect();
        held.sort();
        held.dedup();

        let mut prices = HashMap::new();
        for instrument in held {
            match self.venue.fetch_snapshot(&instrument).await {
                Ok(quote) => {
                    if let Err(e) = self.cache.apply_quote(&quote) {
                        warn!("{}: bad quote: {}", instrument, e);
                    }
                }
                Err(e) => warn!("{}: quote unavailable, marking at cached price: {}", instrument, e),
            }
            if let Some(snapshot) = self.cache.snapshot(&instrument).filter(|s| s.has_price()) {
                prices.insert(instrument, snapshot.price);
            }
        }
        self.apply_prices(prices).await
    }

    /// Closes positions whose stop or target `prices` crossed, then marks the
    /// rest. Returns the number of closes.
    async fn apply_prices(&self, mut prices: HashMap<Instrument, f64>) -> usize {
        let open = self.ledger.lock().await.open_positions();
        let mut closes = 0;
        for position in &open {
            let Some(&price) = prices.get(&position.instrument) else {
                continue;
            };
            let Some(reason) = position.exit_trigger(price) else {
                continue;
            };
            info!("{}: {} hit at {}", position.id, reason, price);
            match self.close_at_market(position, reason).await {
                Ok(()) => closes += 1,
                Err(e) => {
                    error!("{}: exit failed: {:#}", position.id, e);
                    self.events
                        .publish(EngineEvent::error(format!("close {}", position.id), format!("{:#}", e)));
                    // retried next cycle rather than closed at an unfilled price
                    prices.remove(&position.instrument);
                }
            }
        }

        let closed = self.ledger.lock().await.update_prices(&prices);
        closes + closed.len()
    }

    async fn execute_signal(&self, signal: Signal, report: &mut ExecutionReport) {
        let now = Utc::now();
        let max_age = chrono::Duration::seconds(self.config.schedule.signal_max_age_secs as i64);
        if signal.is_stale(now, max_age) {
            report.expired += 1;
            info!("{} {} expired", signal.id, signal.instrument);
            self.events.publish(EngineEvent::SignalExpired {
                age_secs: signal.age(now).num_seconds(),
                signal_id: signal.id,
                instrument: signal.instrument,
            });
            return;
        }

        let balance = self.ledger.lock().await.equity();
        let quantity = {
            let risk = self.risk_state.lock().await;
            self.risk_gate.size_position(&signal, &risk, balance)
        };
        if quantity <= 0.0 {
            report.zero_size += 1;
            debug!("{} {} sized to zero", signal.id, signal.instrument);
            return;
        }

        let fill = match self.orders.execute_entry(&signal, quantity).await {
            Ok(fill) => fill,
            Err(e) => {
                report.failed += 1;
                error!("{} {} order failed: {}", signal.id, signal.instrument, e);
                self.events.publish(EngineEvent::OrderFailed {
                    signal_id: Some(signal.id),
                    instrument: signal.instrument,
                    reason: e.to_string(),
                });
                return;
            }
        };

        let order_id = fill.order_id.clone();
        let (price, filled) = (fill.price, fill.quantity);
        let opened = self.ledger.lock().await.open_position(fill);
        match opened {
            Ok(position) => {
                report.executed += 1;
                self.events.publish(EngineEvent::OrderExecuted {
                    order_id,
                    signal_id: Some(signal.id.clone()),
                    instrument: signal.instrument.clone(),
                    side: signal.action,
                    quantity: filled,
                    price,
                });
                self.orders.place_protective_orders(&position).await;
            }
            Err(e) => {
                report.failed += 1;
                error!("order {} filled but the ledger refused it: {}", order_id, e);
                self.events
                    .publish(EngineEvent::error(format!("ledger {}", order_id), e));
            }
        }
    }

    /// Recomputes metrics and lets the risk gate adapt its limits
    pub async fn performance_cycle(&self) -> Option<PerformanceMetrics> {
        let Ok(_guard) = self.performance_guard.try_lock() else {
            debug!("performance cycle still running, skipping tick");
            return None;
        };
        if !self.is_running().await {
            return None;
        }

        let (metrics, equity) = {
            let ledger = self.ledger.lock().await;
            (ledger.performance_metrics(), ledger.equity())
        };
        let adjustment = {
            let mut risk = self.risk_state.lock().await;
            risk.update_balance(equity);
            self.risk_gate.adapt(&mut risk, &metrics)
        };
        if let Some(adjustment) = adjustment {
            self.events.publish(EngineEvent::RiskAdjusted {
                risk_per_trade: adjustment.risk_per_trade,
                max_open_positions: adjustment.max_open_positions,
                reason: adjustment.reason,
            });
        }

        info!(
            "performance: {} trades, win rate {:.1}%, pnl {:.2}, sharpe {:.2}, max drawdown {:.2}%, equity {:.2}",
            metrics.total_trades,
            metrics.win_rate * 100.0,
            metrics.total_pnl,
            metrics.sharpe_ratio,
            metrics.max_drawdown * 100.0,
            equity
        );
        Some(metrics)
    }

    pub async fn status(&self) -> EngineStatus {
        let state = self.state().await;
        let queued_signals = self.queue.lock().await.len();
        let (open_positions, cash, equity, realized_pnl, unrealized_pnl) = {
            let ledger = self.ledger.lock().await;
            (
                ledger.open_position_count(),
                ledger.cash_balance(),
                ledger.equity(),
                ledger.realized_pnl(),
                ledger.unrealized_pnl(),
            )
        };
        let risk = self.risk_state.lock().await.clone();
        EngineStatus {
            state,
            mode: self.config.mode,
            domain: self.config.domain,
            market_open: self.market_hours.is_open(Utc::now()),
            queued_signals,
            open_positions,
            cash,
            equity,
            realized_pnl,
            unrealized_pnl,
            ticks_received: self.ticks_received.load(Ordering::Relaxed),
            risk,
        }
    }

    pub async fn queued_signals(&self) -> Vec<Signal> {
        self.queue.lock().await.iter().cloned().collect()
    }

    pub async fn open_positions(&self) -> Vec<Position> {
        self.ledger.lock().await.open_positions()
    }

    pub async fn ledger_snapshot(&self) -> LedgerSnapshot {
        self.ledger.lock().await.export_state()
    }

    pub async fn performance_metrics(&self) -> PerformanceMetrics {
        self.ledger.lock().await.performance_metrics()
    }

    /// Marks held positions at the tick price. While the execution cycle
    /// runs it owns the exits and the tick only lands in the cache.
    async fn on_tick(&self, tick: Tick) {
        if !self.is_running().await {
            return;
        }
        let held = self
            .ledger
            .lock()
            .await
            .has_position(&tick.instrument);
        if !held {
            return;
        }
        let Ok(_guard) = self.execution_guard.try_lock() else {
            return;
        };
        let closes = self
            .apply_prices(HashMap::from([(tick.instrument, tick.price)]))
            .await;
        if closes > 0 {
            info!("{} position(s) closed on streamed price", closes);
        }
    }

    /// Feeds streaming ticks into the market cache and the ledger until `stop`
    pub fn attach_ticker_stream(self: &Arc<Self>, source: Arc<dyn TickerSource>) -> JoinHandle<()> {
        let (tx, mut rx) = mpsc::channel::<Tick>(TICK_CHANNEL_CAPACITY);
        let reconnect = Duration::from_secs(self.config.market_data.stream_reconnect_secs.max(1));
        let feed = tokio::spawn(run_ticker_stream(
            source,
            self.cache.clone(),
            tx,
            reconnect,
            self.stream_shutdown.subscribe(),
        ));

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(tick) = rx.recv().await {
                engine.ticks_received.fetch_add(1, Ordering::Relaxed);
                trace!("tick {} @ {}", tick.instrument, tick.price);
                engine.on_tick(tick).await;
            }
            if let Err(e) = feed.await {
                error!("ticker stream task failed: {}", e);
            }
            debug!("ticker consumer finished");
        })
    }
}
