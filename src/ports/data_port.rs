//! Bar data access port trait.

use crate::domain::bar::BarTable;
use crate::domain::error::StratbenchError;

pub trait DataPort {
    /// Loads the full bar table, indicator columns included.
    fn load_bars(&self) -> Result<BarTable, StratbenchError>;

    /// Human-readable origin of the data, for log lines.
    fn describe(&self) -> String;
}
