#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::cell::RefCell;
use stratbench::domain::bar::{Bar, BarTable};
use stratbench::domain::error::StratbenchError;
use stratbench::domain::report::MetricsReport;
use stratbench::domain::signal::Signal;
use stratbench::domain::strategy::SignalSource;
use stratbench::ports::data_port::DataPort;
use stratbench::ports::report_port::ReportPort;
use std::path::{Path, PathBuf};

pub fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_bar(timestamp: NaiveDateTime, close: f64) -> Bar {
    Bar {
        timestamp,
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1_000.0,
    }
}

/// Bars `step` apart starting at [`start_time`].
pub fn make_table(closes: &[f64], step: Duration) -> BarTable {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(start_time() + step * i as i32, close))
        .collect();
    BarTable::new(bars).unwrap()
}

pub fn daily_table(closes: &[f64]) -> BarTable {
    make_table(closes, Duration::days(1))
}

/// A strategy replaying a fixed signal series regardless of input.
pub struct FixedSignals {
    pub name: String,
    pub signals: Vec<Signal>,
}

impl FixedSignals {
    pub fn boxed(name: &str, signals: Vec<Signal>) -> Box<dyn SignalSource> {
        Box::new(Self {
            name: name.to_string(),
            signals,
        })
    }
}

impl SignalSource for FixedSignals {
    fn id(&self) -> &str {
        &self.name
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn generate_signals(&self, _table: &BarTable) -> Result<Vec<Signal>, StratbenchError> {
        Ok(self.signals.clone())
    }
}

/// A strategy whose signal generation always errors.
pub struct FailingSource;

impl SignalSource for FailingSource {
    fn id(&self) -> &str {
        "failing"
    }

    fn name(&self) -> &str {
        "Failing"
    }

    fn generate_signals(&self, table: &BarTable) -> Result<Vec<Signal>, StratbenchError> {
        table.column("Does_Not_Exist")?;
        Ok(vec![Signal::HOLD; table.len()])
    }
}

/// A strategy that panics mid-computation.
pub struct PanickingSource;

impl SignalSource for PanickingSource {
    fn id(&self) -> &str {
        "panicking"
    }

    fn name(&self) -> &str {
        "Panicking"
    }

    fn generate_signals(&self, table: &BarTable) -> Result<Vec<Signal>, StratbenchError> {
        let bars = table.bars();
        let _ = bars[bars.len() + 1].close;
        Ok(Vec::new())
    }
}

pub struct MockDataPort {
    pub table: Option<BarTable>,
}

impl DataPort for MockDataPort {
    fn load_bars(&self) -> Result<BarTable, StratbenchError> {
        self.table.clone().ok_or_else(|| StratbenchError::Data {
            reason: "no data".into(),
        })
    }

    fn describe(&self) -> String {
        "mock".into()
    }
}

/// Captures written reports in memory.
#[derive(Default)]
pub struct RecordingReportPort {
    pub written: RefCell<Vec<(PathBuf, Vec<MetricsReport>)>>,
}

impl ReportPort for RecordingReportPort {
    fn write(&self, reports: &[MetricsReport], output_path: &Path) -> Result<(), StratbenchError> {
        self.written
            .borrow_mut()
            .push((output_path.to_path_buf(), reports.to_vec()));
        Ok(())
    }
}
