//! Report persistence port trait.

use crate::domain::error::StratbenchError;
use crate::domain::report::MetricsReport;
use std::path::Path;

/// Port for writing the batch report table, one row per strategy.
pub trait ReportPort {
    fn write(&self, reports: &[MetricsReport], output_path: &Path) -> Result<(), StratbenchError>;
}
