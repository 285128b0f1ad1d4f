use async_trait::async_trait;
use thiserror::Error;

use crate::entities::Candle;
use crate::value_objects::{Forecast, Instrument};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictorError {
    #[error("not enough data: need {needed} candles, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("predictor unavailable: {0}")]
    Unavailable(String),

    #[error("prediction failed: {0}")]
    Failed(String),
}

/// Directional forecaster; best effort, a failure skips the instrument for the cycle
#[async_trait]
pub trait Predictor: Send + Sync {
    fn name(&self) -> &str;

    /// `window` is the instrument's candle history, oldest first
    async fn predict(
        &self,
        instrument: &Instrument,
        window: &[Candle],
    ) -> Result<Forecast, PredictorError>;
}
