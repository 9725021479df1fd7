//! Per-strategy report row.

use super::metrics::RiskMetrics;
use super::trade::TradeStats;
use serde::Serialize;
use std::fmt;

/// One row of the batch report table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub strategy: String,
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    /// Percentage, 0-100.
    pub win_rate: f64,
    pub profit_factor: f64,
    /// Bars spent in the market. Kept under this name for compatibility with
    /// existing report consumers; see `completed_trades` for round trips.
    pub n_trades: usize,
    pub completed_trades: usize,
    /// Minutes.
    pub avg_trade_duration: f64,
}

impl MetricsReport {
    pub fn new(strategy: impl Into<String>, risk: &RiskMetrics, trades: &TradeStats) -> Self {
        MetricsReport {
            strategy: strategy.into(),
            total_return: risk.total_return,
            sharpe_ratio: risk.sharpe_ratio,
            sortino_ratio: risk.sortino_ratio,
            max_drawdown: risk.max_drawdown,
            win_rate: trades.win_rate * 100.0,
            profit_factor: trades.profit_factor,
            n_trades: trades.signal_event_count,
            completed_trades: trades.completed_trade_count,
            avg_trade_duration: trades.avg_trade_duration,
        }
    }
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.strategy)?;
        writeln!(f, "Total Return:       {:.2}%", self.total_return * 100.0)?;
        writeln!(f, "Sharpe Ratio:       {:.2}", self.sharpe_ratio)?;
        writeln!(f, "Sortino Ratio:      {:.2}", self.sortino_ratio)?;
        writeln!(f, "Max Drawdown:       {:.2}%", self.max_drawdown * 100.0)?;
        writeln!(f, "Win Rate:           {:.2}%", self.win_rate)?;
        writeln!(f, "Profit Factor:      {:.2}", self.profit_factor)?;
        writeln!(f, "Bars In Market:     {}", self.n_trades)?;
        writeln!(f, "Completed Trades:   {}", self.completed_trades)?;
        write!(f, "Avg Trade Duration: {:.2} minutes", self.avg_trade_duration)
    }
}
