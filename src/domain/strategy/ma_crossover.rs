//! Moving average crossover, always in the market after the first cross.
//!
//! Enters Long when the fast SMA crosses above the slow SMA and Short when it
//! crosses below. There is no separate exit: each cross reverses the
//! position.
//!
//! Reads precomputed columns `SMA_{fast}` and `SMA_{slow}`.

use super::{config_section, period_param, SignalSource};
use crate::domain::bar::BarTable;
use crate::domain::error::StratbenchError;
use crate::domain::signal::{Direction, Signal};
use crate::ports::config_port::ConfigPort;

pub const ID: &str = "ma_crossover";

#[derive(Debug, Clone, PartialEq)]
pub struct MaCrossover {
    pub fast_period: usize,
    pub slow_period: usize,
    fast_key: String,
    slow_key: String,
}

impl MaCrossover {
    pub fn new(fast_period: usize, slow_period: usize) -> Result<Self, StratbenchError> {
        if slow_period <= fast_period {
            return Err(StratbenchError::ConfigInvalid {
                section: config_section(ID),
                key: "slow_period".into(),
                reason: format!("must be greater than fast_period ({fast_period})"),
            });
        }
        Ok(Self {
            fast_period,
            slow_period,
            fast_key: format!("SMA_{fast_period}"),
            slow_key: format!("SMA_{slow_period}"),
        })
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StratbenchError> {
        let fast = period_param(config, ID, "fast_period", 20)?;
        let slow = period_param(config, ID, "slow_period", 50)?;
        Self::new(fast, slow)
    }

    pub fn fast_column(&self) -> &str {
        &self.fast_key
    }

    pub fn slow_column(&self) -> &str {
        &self.slow_key
    }
}

pub fn boxed(config: &dyn ConfigPort) -> Result<Box<dyn SignalSource>, StratbenchError> {
    Ok(Box::new(MaCrossover::from_config(config)?))
}

impl SignalSource for MaCrossover {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "Moving Average Crossover"
    }

    fn generate_signals(&self, table: &BarTable) -> Result<Vec<Signal>, StratbenchError> {
        let fast = table.column(&self.fast_key)?;
        let slow = table.column(&self.slow_key)?;

        let mut signals = Vec::with_capacity(table.len());
        signals.extend((0..table.len()).map(|i| {
            let Some(p) = i.checked_sub(1) else {
                return Signal::HOLD;
            };
            // NaN during warmup compares false on every branch.
            if fast[i] > slow[i] && fast[p] <= slow[p] {
                Signal::enter(Direction::Long)
            } else if fast[i] < slow[i] && fast[p] >= slow[p] {
                Signal::enter(Direction::Short)
            } else {
                Signal::HOLD
            }
        }));
        Ok(signals)
    }
}
