use quant_pilot_core::SignalSettings;
use quant_pilot_domain::{Forecast, MarketSnapshot, Signal};

use crate::error::StrategyError;
use crate::framework::SignalGenerator;

pub const PREDICTOR_ENSEMBLE_NAME: &str = "predictor_ensemble";

/// Defers to the [`SignalGenerator`]; yields nothing when no forecast is available
#[derive(Debug, Clone)]
pub struct PredictorEnsembleStrategy {
    generator: SignalGenerator,
}

impl PredictorEnsembleStrategy {
    pub fn new(settings: SignalSettings) -> Self {
        Self {
            generator: SignalGenerator::new(settings),
        }
    }

    pub fn analyze(
        &self,
        snapshot: &MarketSnapshot,
        forecast: Option<&Forecast>,
    ) -> Result<Option<Signal>, StrategyError> {
        if !snapshot.has_price() {
            return Err(StrategyError::NoPrice(snapshot.instrument.to_string()));
        }
        Ok(self.generator.generate(snapshot, forecast))
    }
}
