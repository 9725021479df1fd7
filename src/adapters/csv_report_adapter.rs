//! CSV report writer.
//!
//! One header row followed by one row per strategy, in the order given.
//! Infinite values (a profit factor with no losing trades) are written as
//! `inf`.

use crate::domain::error::StratbenchError;
use crate::domain::report::MetricsReport;
use crate::ports::report_port::ReportPort;
use std::path::Path;
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn report_error(path: &Path, err: impl std::fmt::Display) -> StratbenchError {
    StratbenchError::Report {
        reason: format!("failed to write {}: {}", path.display(), err),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, reports: &[MetricsReport], output_path: &Path) -> Result<(), StratbenchError> {
        let mut wtr = csv::Writer::from_path(output_path).map_err(|e| report_error(output_path, e))?;
        for report in reports {
            wtr.serialize(report)
                .map_err(|e| report_error(output_path, e))?;
        }
        wtr.flush().map_err(|e| report_error(output_path, e))?;

        info!(path = %output_path.display(), rows = reports.len(), "report written");
        Ok(())
    }
}
