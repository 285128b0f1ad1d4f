mod trend_predictor;

pub use trend_predictor::TrendPredictor;
