//! Risk and return statistics over a strategy return series.

use super::error::ComputationError;

/// Annualization base for every ratio, regardless of bar interval.
pub const TRADING_PERIODS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskMetrics {
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// Most negative peak-to-trough decline, as a fraction (always <= 0).
    pub max_drawdown: f64,
}

impl RiskMetrics {
    /// Compounded total return and drawdown come from `bar_returns`; the
    /// annualized ratios come from `daily_returns`. The risk-free rate is 0.
    pub fn compute(daily_returns: &[f64], bar_returns: &[f64]) -> Result<Self, ComputationError> {
        let total_return = compute_total_return(bar_returns);
        let max_drawdown = compute_drawdown(bar_returns);
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(daily_returns);

        ensure_finite("total_return", total_return)?;
        ensure_finite("sharpe_ratio", sharpe_ratio)?;
        ensure_finite("sortino_ratio", sortino_ratio)?;
        ensure_finite("max_drawdown", max_drawdown)?;

        Ok(RiskMetrics {
            total_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
        })
    }
}

fn ensure_finite(metric: &'static str, value: f64) -> Result<(), ComputationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ComputationError::NonFinite { metric })
    }
}

fn compute_total_return(bar_returns: &[f64]) -> f64 {
    bar_returns.iter().map(|r| 1.0 + r).product::<f64>() - 1.0
}

fn compute_drawdown(bar_returns: &[f64]) -> f64 {
    let mut equity = 1.0_f64;
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for r in bar_returns {
        equity *= 1.0 + r;
        if equity > peak {
            peak = equity;
        } else if peak > 0.0 {
            let dd = (equity - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1). `None` below two observations.
fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    // Identical values give an exact zero rather than rounding noise.
    if values.iter().all(|v| *v == values[0]) {
        return Some(0.0);
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

fn annualized_ratio(mean_return: f64, stddev: Option<f64>) -> f64 {
    match stddev {
        Some(sd) if sd > 0.0 => TRADING_PERIODS_PER_YEAR.sqrt() * mean_return / sd,
        _ => 0.0,
    }
}

fn compute_risk_adjusted(daily_returns: &[f64]) -> (f64, f64) {
    if daily_returns.is_empty() {
        return (0.0, 0.0);
    }

    let mean_return = mean(daily_returns);
    let sharpe = annualized_ratio(mean_return, sample_stddev(daily_returns));

    let downside: Vec<f64> = daily_returns.iter().copied().filter(|r| *r < 0.0).collect();
    let sortino = annualized_ratio(mean_return, sample_stddev(&downside));

    (sharpe, sortino)
}
