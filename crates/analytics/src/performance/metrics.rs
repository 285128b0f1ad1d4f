//! Performance metrics over closed trades
//!
//! - Win rate: winning trades / total trades
//! - Profit factor: gross profit / |gross loss|
//! - Sharpe: mean / std of per-trade P&L, annualised by √252
//! - Max drawdown: largest relative peak-to-trough decline of the equity curve
//! - VaR 95%: historical 5% quantile of per-trade P&L, as a loss amount
//!
//! Every metric is zero (never NaN) on an empty history.

use serde::{Deserialize, Serialize};

use quant_pilot_domain::ClosedTrade;

/// Annualisation factor for the Sharpe ratio
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

pub const VAR_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub gross_profit: f64,
    /// Magnitude of the summed losses
    pub gross_loss: f64,
    pub profit_factor: f64,
    pub average_win: f64,
    /// Magnitude of the mean losing trade
    pub average_loss: f64,
    pub largest_win: f64,
    /// Magnitude of the worst trade
    pub largest_loss: f64,
    pub sharpe_ratio: f64,
    /// Fraction of the running peak (0.1 = 10%)
    pub max_drawdown: f64,
    /// Non-negative loss amount
    pub value_at_risk_95: f64,
    /// Baseline followed by equity after each trade
    pub equity_curve: Vec<f64>,
}

pub struct PerformanceCalculator<'a> {
    baseline_equity: f64,
    trades: &'a [ClosedTrade],
}

impl<'a> PerformanceCalculator<'a> {
    /// `trades` in close order; `baseline_equity` is the equity before the first
    pub fn new(baseline_equity: f64, trades: &'a [ClosedTrade]) -> Self {
        Self {
            baseline_equity,
            trades,
        }
    }

    pub fn calculate(&self) -> PerformanceMetrics {
        let pnls: Vec<f64> = self.trades.iter().map(|t| t.realized_pnl).collect();
        let equity_curve = self.equity_curve(&pnls);
        if pnls.is_empty() {
            return PerformanceMetrics {
                equity_curve,
                ..PerformanceMetrics::default()
            };
        }

        let wins: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
        let losses: Vec<f64> = pnls.iter().copied().filter(|p| *p < 0.0).collect();
        let gross_profit: f64 = wins.iter().sum();
        let gross_loss: f64 = losses.iter().sum::<f64>().abs();
        let total = pnls.len();

        PerformanceMetrics {
            total_trades: total,
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate: wins.len() as f64 / total as f64,
            total_pnl: pnls.iter().sum(),
            gross_profit,
            gross_loss,
            profit_factor: profit_factor(gross_profit, gross_loss),
            average_win: if wins.is_empty() { 0.0 } else { gross_profit / wins.len() as f64 },
            average_loss: if losses.is_empty() { 0.0 } else { gross_loss / losses.len() as f64 },
            largest_win: wins.iter().copied().fold(0.0, f64::max),
            largest_loss: losses.iter().copied().fold(0.0, f64::min).abs(),
            sharpe_ratio: sharpe_ratio(&pnls),
            max_drawdown: max_drawdown(&equity_curve),
            value_at_risk_95: value_at_risk(&pnls, VAR_CONFIDENCE),
            equity_curve,
        }
    }

    fn equity_curve(&self, pnls: &[f64]) -> Vec<f64> {
        let mut curve = Vec::with_capacity(pnls.len() + 1);
        let mut equity = self.baseline_equity;
        curve.push(equity);
        for pnl in pnls {
            equity += pnl;
            curve.push(equity);
        }
        curve
    }
}

/// 0 with neither profit nor loss; gross profit when there is no loss
fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else {
        gross_profit
    }
}

/// Population standard deviation; 0 when the std is 0
fn sharpe_ratio(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    let n = pnls.len() as f64;
    let mean = pnls.iter().sum::<f64>() / n;
    let variance = pnls.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    if std_dev <= f64::EPSILON {
        return 0.0;
    }
    mean / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
}

fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = match equity_curve.first() {
        Some(first) => *first,
        None => return 0.0,
    };
    let mut worst = 0.0;
    for &equity in equity_curve {
        if equity > peak {
            peak = equity;
        }
        if peak > 0.0 {
            let drawdown = (peak - equity) / peak;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst
}

/// Historical VaR: the P&L at the `(1 - confidence)` quantile (lower
/// nearest rank), reported as a non-negative loss
fn value_at_risk(pnls: &[f64], confidence: f64) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    let mut sorted = pnls.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let index = (((1.0 - confidence) * sorted.len() as f64).floor() as usize).min(sorted.len() - 1);
    (-sorted[index]).max(0.0)
}

/// Convenience wrapper around [`PerformanceCalculator`]
pub fn calculate_performance_metrics(
    baseline_equity: f64,
    trades: &[ClosedTrade],
) -> PerformanceMetrics {
    PerformanceCalculator::new(baseline_equity, trades).calculate()
}
