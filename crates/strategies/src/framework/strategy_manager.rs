use std::sync::Arc;

use tracing::{debug, warn};

use quant_pilot_domain::{Forecast, MarketSnapshot, Signal};

use super::StrategyRegistry;
use crate::error::StrategyError;

/// Outcome of running every registered strategy on one snapshot
#[derive(Debug, Default)]
pub struct StrategyRun {
    pub signals: Vec<Signal>,
    /// Strategy name and the error it returned
    pub failures: Vec<(String, StrategyError)>,
}

/// Runs all registered strategies against a snapshot.
///
/// A failing strategy is recorded in [`StrategyRun::failures`] and the rest
/// still run.
pub struct StrategyManager {
    registry: Arc<StrategyRegistry>,
}

impl StrategyManager {
    pub fn new(registry: Arc<StrategyRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }

    /// Whether any registered strategy wants a forecast
    pub fn needs_forecast(&self) -> bool {
        self.registry.all().iter().any(|s| s.uses_forecast())
    }

    pub fn run_all(&self, snapshot: &MarketSnapshot, forecast: Option<&Forecast>) -> StrategyRun {
        let mut run = StrategyRun::default();
        for strategy in self.registry.all() {
            match strategy.analyze(snapshot, forecast) {
                Ok(Some(signal)) => {
                    debug!(
                        "{} produced {} {} @ {:.4} (confidence {:.3})",
                        strategy.name(),
                        signal.action,
                        signal.instrument,
                        signal.price,
                        signal.confidence
                    );
                    run.signals.push(signal);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("{} failed on {}: {}", strategy.name(), snapshot.instrument, e);
                    run.failures.push((strategy.name().to_string(), e));
                }
            }
        }
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quant_pilot_core::SignalSettings;
    use quant_pilot_domain::{BollingerValue, ForecastDirection, Instrument, MacdValue, Probabilities};

    fn manager(names: &[&str]) -> StrategyManager {
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        let registry = StrategyRegistry::from_names(&names, &SignalSettings::default()).unwrap();
        StrategyManager::new(Arc::new(registry))
    }

    fn snapshot() -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::new(Instrument::new("NVDA").unwrap());
        snapshot.price = 85.0;
        snapshot.indicators.rsi = Some(60.0);
        snapshot.indicators.macd = Some(MacdValue {
            macd: 1.0,
            signal: 0.5,
            histogram: 0.5,
        });
        snapshot.indicators.bollinger = Some(BollingerValue {
            upper: 110.0,
            middle: 100.0,
            lower: 90.0,
        });
        snapshot
    }

    #[test]
    fn test_collects_every_signal() {
        let manager = manager(&["momentum", "mean_reversion", "predictor_ensemble"]);
        let forecast = Forecast {
            confidence: 0.9,
            direction: ForecastDirection::Up,
            predicted_price: 90.0,
            probabilities: Probabilities::normalized(0.9, 0.05, 0.05),
        };
        let run = manager.run_all(&snapshot(), Some(&forecast));
        assert!(run.failures.is_empty());
        let mut sources: Vec<&str> = run.signals.iter().map(|s| s.metadata.source.as_str()).collect();
        sources.sort();
        assert_eq!(sources, vec!["mean_reversion", "momentum", "predictor_ensemble"]);
        assert!(manager.needs_forecast());
    }

    #[test]
    fn test_failures_are_isolated() {
        let manager = manager(&["momentum", "mean_reversion"]);
        let mut snap = snapshot();
        snap.price = 0.0;
        let run = manager.run_all(&snap, None);
        assert!(run.signals.is_empty());
        assert_eq!(run.failures.len(), 2);
        assert!(!manager.needs_forecast());
    }
}
