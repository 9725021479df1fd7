//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvBarAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_batch, BacktestConfig, BatchReport};
use crate::domain::error::StratbenchError;
use crate::domain::strategy::StrategyRegistry;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_DATA_PATH: &str = "data/btc_all_features.csv";
pub const DEFAULT_OUTPUT_PATH: &str = "backtest_results.csv";
const BACKTEST_SECTION: &str = "backtest";

#[derive(Parser, Debug)]
#[command(
    name = "stratbench",
    about = "Batch backtester for signal-driven trading strategies"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest strategies against one bar dataset
    Run(RunArgs),
    /// List registered strategies
    List,
}

#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// INI config with [backtest] and [strategy.<id>] sections
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Bar CSV; overrides [backtest] data_path
    #[arg(short, long)]
    pub data: Option<PathBuf>,
    /// Report CSV; overrides [backtest] output_path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Strategy ids to run, or `all`
    #[arg(short, long, num_args = 1.., value_delimiter = ',')]
    pub strategies: Vec<String>,
    #[arg(long)]
    pub parallel: bool,
    /// Worker threads for --parallel
    #[arg(long)]
    pub threads: Option<usize>,
    /// Close a position still open at the last bar
    #[arg(long)]
    pub force_close: bool,
}

/// Fully resolved run parameters: CLI flags layered over the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub data_path: PathBuf,
    pub output_path: PathBuf,
    pub strategies: Vec<String>,
    pub backtest: BacktestConfig,
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the `info`
/// default.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // A subscriber may already be installed (e.g. by a test harness).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Run(args) => run_command(&args),
        Command::List => {
            run_list(&StrategyRegistry::with_builtins());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Loads the INI file at `path`, or an empty config when none is given.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, StratbenchError> {
    match path {
        None => Ok(FileConfigAdapter::empty()),
        Some(path) => {
            info!(path = %path.display(), "loading config");
            FileConfigAdapter::from_file(path).map_err(|e| StratbenchError::ConfigParse {
                file: path.display().to_string(),
                reason: e.to_string(),
            })
        }
    }
}

pub fn build_run_settings(
    args: &RunArgs,
    config: &dyn ConfigPort,
) -> Result<RunSettings, StratbenchError> {
    let data_path = args
        .data
        .clone()
        .or_else(|| config.get_string(BACKTEST_SECTION, "data_path").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));
    let output_path = args
        .output
        .clone()
        .or_else(|| config.get_string(BACKTEST_SECTION, "output_path").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH));

    let strategies = if args.strategies.is_empty() {
        config
            .get_string(BACKTEST_SECTION, "strategies")
            .map(|list| parse_strategy_list(&list))
            .unwrap_or_default()
    } else {
        args.strategies.clone()
    };

    let threads = match args.threads {
        Some(n) => Some(n),
        None => config_threads(config)?,
    };
    if threads == Some(0) {
        return Err(StratbenchError::ConfigInvalid {
            section: BACKTEST_SECTION.into(),
            key: "threads".into(),
            reason: "must be at least 1".into(),
        });
    }

    Ok(RunSettings {
        data_path,
        output_path,
        strategies,
        backtest: BacktestConfig {
            force_close_at_end: args.force_close
                || config.get_bool(BACKTEST_SECTION, "force_close_at_end", false),
            parallel: args.parallel || config.get_bool(BACKTEST_SECTION, "parallel", false),
            threads,
        },
    })
}

fn config_threads(config: &dyn ConfigPort) -> Result<Option<usize>, StratbenchError> {
    match config.get_string(BACKTEST_SECTION, "threads") {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| StratbenchError::ConfigInvalid {
                section: BACKTEST_SECTION.into(),
                key: "threads".into(),
                reason: format!("expected a positive integer, got {raw:?}"),
            }),
    }
}

fn parse_strategy_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Builds the selected strategies, loads the bars, runs the batch and writes
/// the report. Per-strategy failures are returned in the batch, not as an
/// error.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    registry: &StrategyRegistry,
    settings: &RunSettings,
    config: &dyn ConfigPort,
) -> Result<BatchReport, StratbenchError> {
    let sources = registry.build_selection(&settings.strategies, config)?;

    info!(source = %data_port.describe(), "loading bars");
    let table = data_port.load_bars()?;

    info!(
        strategies = sources.len(),
        bars = table.len(),
        parallel = settings.backtest.parallel,
        "running batch"
    );
    let batch = run_batch(&sources, &table, &settings.backtest);

    for report in &batch.reports {
        eprintln!("{report}");
    }
    report_port.write(&batch.reports, &settings.output_path)?;

    info!(
        succeeded = batch.reports.len(),
        failed = batch.failures.len(),
        output = %settings.output_path.display(),
        "batch complete"
    );
    Ok(batch)
}

fn run_command(args: &RunArgs) -> Result<(), StratbenchError> {
    let config = load_config(args.config.as_deref())?;
    let settings = build_run_settings(args, &config)?;

    let data_port = CsvBarAdapter::new(&settings.data_path);
    let batch = run_backtest_pipeline(
        &data_port,
        &CsvReportAdapter::new(),
        &StrategyRegistry::with_builtins(),
        &settings,
        &config,
    )?;

    for failure in &batch.failures {
        eprintln!("warning: {} failed: {}", failure.strategy, failure.error);
    }
    Ok(())
}

fn run_list(registry: &StrategyRegistry) {
    let defaults = FileConfigAdapter::empty();
    for id in registry.ids() {
        match registry.build(id, &defaults) {
            Ok(source) => println!("{id:<20} {}", source.name()),
            Err(_) => println!("{id}"),
        }
    }
}
