mod risk_state;

pub use risk_state::RiskState;
