//! Built-in strategies

pub mod mean_reversion;
pub mod momentum;
pub mod predictor_ensemble;

pub use mean_reversion::{MeanReversionStrategy, MEAN_REVERSION_NAME};
pub use momentum::{MomentumStrategy, MOMENTUM_NAME};
pub use predictor_ensemble::{PredictorEnsembleStrategy, PREDICTOR_ENSEMBLE_NAME};
