use quant_pilot_core::SignalSettings;
use quant_pilot_domain::{Forecast, MarketSnapshot, Signal};

use crate::error::StrategyError;
use crate::implementations::{
    MeanReversionStrategy, MomentumStrategy, PredictorEnsembleStrategy, MEAN_REVERSION_NAME,
    MOMENTUM_NAME, PREDICTOR_ENSEMBLE_NAME,
};

/// The closed set of strategies. Adding a strategy means adding a variant.
#[derive(Debug, Clone)]
pub enum StrategyKind {
    Momentum(MomentumStrategy),
    MeanReversion(MeanReversionStrategy),
    PredictorEnsemble(PredictorEnsembleStrategy),
}

impl StrategyKind {
    /// Names accepted by [`StrategyKind::from_name`]
    pub const NAMES: [&'static str; 3] = [MOMENTUM_NAME, MEAN_REVERSION_NAME, PREDICTOR_ENSEMBLE_NAME];

    /// Builds a strategy from its registry name (case-insensitive, `-` or `_`)
    pub fn from_name(name: &str, settings: &SignalSettings) -> Result<Self, StrategyError> {
        let normalized = name.trim().to_lowercase().replace('-', "_");
        match normalized.as_str() {
            MOMENTUM_NAME => Ok(StrategyKind::Momentum(MomentumStrategy::new(settings.clone()))),
            MEAN_REVERSION_NAME => Ok(StrategyKind::MeanReversion(MeanReversionStrategy::new(
                settings.clone(),
            ))),
            PREDICTOR_ENSEMBLE_NAME | "predictor" | "ensemble" => Ok(
                StrategyKind::PredictorEnsemble(PredictorEnsembleStrategy::new(settings.clone())),
            ),
            _ => Err(StrategyError::UnknownStrategy(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Momentum(_) => MOMENTUM_NAME,
            StrategyKind::MeanReversion(_) => MEAN_REVERSION_NAME,
            StrategyKind::PredictorEnsemble(_) => PREDICTOR_ENSEMBLE_NAME,
        }
    }

    /// Whether the strategy consumes predictor output
    pub fn uses_forecast(&self) -> bool {
        matches!(self, StrategyKind::PredictorEnsemble(_))
    }

    pub fn analyze(
        &self,
        snapshot: &MarketSnapshot,
        forecast: Option<&Forecast>,
    ) -> Result<Option<Signal>, StrategyError> {
        match self {
            StrategyKind::Momentum(s) => s.analyze(snapshot),
            StrategyKind::MeanReversion(s) => s.analyze(snapshot),
            StrategyKind::PredictorEnsemble(s) => s.analyze(snapshot, forecast),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        let settings = SignalSettings::default();
        assert_eq!(
            StrategyKind::from_name("Mean-Reversion", &settings).unwrap().name(),
            MEAN_REVERSION_NAME
        );
        assert!(StrategyKind::from_name("ensemble", &settings)
            .unwrap()
            .uses_forecast());
        assert_eq!(
            StrategyKind::from_name("vegas", &settings).unwrap_err(),
            StrategyError::UnknownStrategy("vegas".to_string())
        );
        for name in StrategyKind::NAMES {
            assert_eq!(StrategyKind::from_name(name, &settings).unwrap().name(), name);
        }
    }
}
