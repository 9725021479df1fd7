//! Backtest runner.
//!
//! Drives one strategy through the full pipeline (signals, positions,
//! returns, risk metrics, trades) and runs batches of strategies with
//! per-strategy failure isolation.

use super::bar::BarTable;
use super::error::{InputError, StratbenchError};
use super::metrics::RiskMetrics;
use super::position::simulate;
use super::report::MetricsReport;
use super::returns::BarReturns;
use super::strategy::SignalSource;
use super::trade::TradeAnalyzer;
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BacktestConfig {
    /// Close a position still open at the last bar instead of dropping it.
    pub force_close_at_end: bool,
    pub parallel: bool,
    /// Worker pool size for parallel batches; `None` uses the global pool.
    pub threads: Option<usize>,
}

#[derive(Debug)]
pub struct StrategyFailure {
    pub strategy: String,
    pub error: StratbenchError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub reports: Vec<MetricsReport>,
    pub failures: Vec<StrategyFailure>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs a single strategy over `table` and returns its report row.
pub fn run_strategy(
    source: &dyn SignalSource,
    table: &BarTable,
    config: &BacktestConfig,
) -> Result<MetricsReport, StratbenchError> {
    let span = info_span!("strategy", id = source.id());
    let _guard = span.enter();
    let started = Instant::now();

    let signals = source.generate_signals(table)?;
    if signals.len() != table.len() {
        return Err(InputError::LengthMismatch {
            what: "signal series".into(),
            expected: table.len(),
            actual: signals.len(),
        }
        .into());
    }
    debug!(elapsed_us = started.elapsed().as_micros() as u64, "signals generated");

    let positions = simulate(&signals);
    let returns = BarReturns::compute(&positions, table.bars())?;
    let risk = RiskMetrics::compute(&returns.daily_values(), &returns.strategy_returns)?;
    debug!(elapsed_us = started.elapsed().as_micros() as u64, "risk metrics computed");

    let (trades, stats) =
        TradeAnalyzer::new(config.force_close_at_end).extract(&positions, table.bars())?;
    if stats.open_at_end && !config.force_close_at_end {
        warn!("position still open at last bar, final trade not counted");
    }

    info!(
        trades = trades.len(),
        total_return = risk.total_return,
        elapsed_us = started.elapsed().as_micros() as u64,
        "backtest complete"
    );
    Ok(MetricsReport::new(source.name(), &risk, &stats))
}

/// Runs every source over the same table. A strategy that errors or panics
/// is recorded as a failure and never stops the rest of the batch.
pub fn run_batch(
    sources: &[Box<dyn SignalSource>],
    table: &BarTable,
    config: &BacktestConfig,
) -> BatchReport {
    let outcomes = if config.parallel {
        run_parallel(sources, table, config)
    } else {
        sources
            .iter()
            .map(|source| run_isolated(source.as_ref(), table, config))
            .collect()
    };

    let mut batch = BatchReport::default();
    for (strategy, outcome) in outcomes {
        match outcome {
            Ok(report) => batch.reports.push(report),
            Err(err) => {
                error!(strategy = %strategy, error = %err, "strategy failed");
                batch.failures.push(StrategyFailure {
                    strategy,
                    error: err,
                });
            }
        }
    }

    if config.parallel {
        batch.reports.sort_by(|a, b| a.strategy.cmp(&b.strategy));
        batch.failures.sort_by(|a, b| a.strategy.cmp(&b.strategy));
    }
    batch
}

type Outcome = (String, Result<MetricsReport, StratbenchError>);

fn run_parallel(
    sources: &[Box<dyn SignalSource>],
    table: &BarTable,
    config: &BacktestConfig,
) -> Vec<Outcome> {
    let run_all = || {
        sources
            .par_iter()
            .map(|source| run_isolated(source.as_ref(), table, config))
            .collect::<Vec<_>>()
    };

    match config.threads {
        Some(threads) => match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(run_all),
            Err(err) => {
                warn!(error = %err, "failed to build worker pool, using global pool");
                run_all()
            }
        },
        None => run_all(),
    }
}

fn run_isolated(source: &dyn SignalSource, table: &BarTable, config: &BacktestConfig) -> Outcome {
    let name = source.name().to_string();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_strategy(source, table, config)))
        .unwrap_or_else(|payload| {
            Err(StratbenchError::Panicked {
                message: panic_message(payload.as_ref()),
            })
        });
    (name, outcome)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::{Direction, Signal};
    use crate::domain::strategy::test_support::hourly_table;
    use approx::assert_relative_eq;

    struct Fixed {
        name: &'static str,
        signals: Vec<Signal>,
    }

    impl SignalSource for Fixed {
        fn id(&self) -> &str {
            self.name
        }
        fn name(&self) -> &str {
            self.name
        }
        fn generate_signals(&self, _table: &BarTable) -> Result<Vec<Signal>, StratbenchError> {
            Ok(self.signals.clone())
        }
    }

    struct Panicking;

    impl SignalSource for Panicking {
        fn id(&self) -> &str {
            "panicking"
        }
        fn name(&self) -> &str {
            "Panicking"
        }
        fn generate_signals(&self, _table: &BarTable) -> Result<Vec<Signal>, StratbenchError> {
            panic!("indicator blew up")
        }
    }

    fn long_then_exit() -> Vec<Signal> {
        vec![
            Signal::enter(Direction::Long),
            Signal::HOLD,
            Signal::EXIT,
            Signal::HOLD,
        ]
    }

    fn fixed(name: &'static str, signals: Vec<Signal>) -> Box<dyn SignalSource> {
        Box::new(Fixed { name, signals })
    }

    #[test]
    fn run_strategy_single_winning_trade() {
        let table = hourly_table(&[100.0, 110.0, 121.0, 121.0], &[1.0; 4]);
        let source = Fixed {
            name: "winner",
            signals: long_then_exit(),
        };
        let report = run_strategy(&source, &table, &BacktestConfig::default()).unwrap();

        assert_eq!(report.strategy, "winner");
        assert_relative_eq!(report.total_return, 0.21, epsilon = 1e-12);
        assert_eq!(report.max_drawdown, 0.0);
        // One calendar day: too few observations for a ratio.
        assert_eq!(report.sharpe_ratio, 0.0);
        assert_eq!(report.win_rate, 100.0);
        assert!(report.profit_factor.is_infinite());
        assert_eq!(report.n_trades, 2);
        assert_eq!(report.completed_trades, 1);
        assert_relative_eq!(report.avg_trade_duration, 120.0);
    }

    #[test]
    fn run_strategy_rejects_short_signal_series() {
        let table = hourly_table(&[100.0, 101.0, 102.0], &[1.0; 3]);
        let source = Fixed {
            name: "short",
            signals: vec![Signal::HOLD; 2],
        };
        let err = run_strategy(&source, &table, &BacktestConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            StratbenchError::Input(InputError::LengthMismatch { expected: 3, actual: 2, .. })
        ));
    }

    #[test]
    fn force_close_counts_open_trade() {
        let table = hourly_table(&[100.0, 105.0, 110.0], &[1.0; 3]);
        let signals = vec![Signal::enter(Direction::Long), Signal::HOLD, Signal::HOLD];
        let source = Fixed { name: "open", signals };

        let dropped = run_strategy(&source, &table, &BacktestConfig::default()).unwrap();
        assert_eq!(dropped.completed_trades, 0);

        let config = BacktestConfig {
            force_close_at_end: true,
            ..BacktestConfig::default()
        };
        let closed = run_strategy(&source, &table, &config).unwrap();
        assert_eq!(closed.completed_trades, 1);
        assert_eq!(closed.win_rate, 100.0);
    }

    #[test]
    fn batch_contains_errors_and_panics() {
        let table = hourly_table(&[100.0, 110.0, 121.0, 121.0], &[1.0; 4]);
        let sources = vec![
            fixed("A", long_then_exit()),
            fixed("B", vec![Signal::HOLD]),
            Box::new(Panicking) as Box<dyn SignalSource>,
            fixed("C", vec![Signal::HOLD; 4]),
        ];
        let batch = run_batch(&sources, &table, &BacktestConfig::default());

        let names: Vec<&str> = batch.reports.iter().map(|r| r.strategy.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(batch.failures.len(), 2);
        assert_eq!(batch.failures[0].strategy, "B");
        assert!(matches!(
            &batch.failures[1].error,
            StratbenchError::Panicked { message } if message == "indicator blew up"
        ));
        assert!(!batch.is_complete());
    }

    #[test]
    fn parallel_batch_sorted_by_name() {
        let table = hourly_table(&[100.0, 110.0, 121.0, 121.0], &[1.0; 4]);
        let sources = vec![
            fixed("zeta", long_then_exit()),
            fixed("alpha", vec![Signal::HOLD; 4]),
            fixed("mu", long_then_exit()),
        ];
        let config = BacktestConfig {
            parallel: true,
            threads: Some(2),
            ..BacktestConfig::default()
        };
        let batch = run_batch(&sources, &table, &config);
        let names: Vec<&str> = batch.reports.iter().map(|r| r.strategy.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mu", "zeta"]);
        assert!(batch.is_complete());
    }

    #[test]
    fn parallel_matches_sequential() {
        let table = hourly_table(&[100.0, 110.0, 99.0, 104.0], &[1.0; 4]);
        let sources = vec![
            fixed("a", long_then_exit()),
            fixed("b", vec![
                Signal::enter(Direction::Short),
                Signal::HOLD,
                Signal::HOLD,
                Signal::HOLD,
            ]),
        ];
        let sequential = run_batch(&sources, &table, &BacktestConfig::default());
        let parallel = run_batch(
            &sources,
            &table,
            &BacktestConfig {
                parallel: true,
                ..BacktestConfig::default()
            },
        );
        assert_eq!(sequential.reports, parallel.reports);
    }

    #[test]
    fn panic_message_variants() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic payload");
    }
}
