//! Pairwise correlation estimates used by the risk gate

use quant_pilot_domain::Instrument;

pub const SAME_BASE_CORRELATION: f64 = 1.0;
pub const KNOWN_PAIR_CORRELATION: f64 = 0.7;
pub const DEFAULT_CORRELATION: f64 = 0.3;

/// Estimates the correlation between two instruments in [0, 1]
pub trait CorrelationPolicy: Send + Sync {
    fn name(&self) -> &str;

    fn correlation(&self, a: &Instrument, b: &Instrument) -> f64;
}

/// Fixed-coefficient heuristic.
///
/// Same base asset correlates fully, a curated list of base-asset pairs
/// correlates at [`KNOWN_PAIR_CORRELATION`], anything else at
/// [`DEFAULT_CORRELATION`].
#[derive(Debug, Clone)]
pub struct HeuristicCorrelation {
    known_pairs: Vec<(String, String)>,
}

impl HeuristicCorrelation {
    pub fn new<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        Self {
            known_pairs: pairs
                .into_iter()
                .map(|(a, b)| (a.as_ref().to_uppercase(), b.as_ref().to_uppercase()))
                .collect(),
        }
    }

    fn is_known_pair(&self, a: &str, b: &str) -> bool {
        self.known_pairs
            .iter()
            .any(|(x, y)| (x == a && y == b) || (x == b && y == a))
    }
}

impl Default for HeuristicCorrelation {
    fn default() -> Self {
        Self::new([("BTC", "ETH"), ("SOL", "AVAX"), ("MATIC", "BNB")])
    }
}

impl CorrelationPolicy for HeuristicCorrelation {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn correlation(&self, a: &Instrument, b: &Instrument) -> f64 {
        if a.base() == b.base() {
            SAME_BASE_CORRELATION
        } else if self.is_known_pair(a.base(), b.base()) {
            KNOWN_PAIR_CORRELATION
        } else {
            DEFAULT_CORRELATION
        }
    }
}
