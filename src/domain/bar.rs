//! Bar and bar table representation.
//!
//! A [`BarTable`] is the read-only input of every backtest: an ordered run of
//! OHLCV bars plus any number of named indicator columns aligned with them.

use super::error::InputError;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Calendar date of the bar, used for daily return aggregation.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BarTable {
    bars: Vec<Bar>,
    columns: HashMap<String, Vec<f64>>,
}

impl BarTable {
    /// Builds a table from bars that must already be in strictly increasing
    /// timestamp order.
    pub fn new(bars: Vec<Bar>) -> Result<Self, InputError> {
        if let Some(pos) = bars
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(InputError::NonIncreasingTimestamp { row: pos + 1 });
        }
        Ok(Self {
            bars,
            columns: HashMap::new(),
        })
    }

    /// Attaches an indicator column. The column must have one value per bar.
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, InputError> {
        let name = name.into();
        if values.len() != self.bars.len() {
            return Err(InputError::LengthMismatch {
                what: format!("column {name}"),
                expected: self.bars.len(),
                actual: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(self)
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Looks up an indicator column. A missing column is a precondition
    /// failure of whichever strategy asked for it.
    pub fn column(&self, name: &str) -> Result<&[f64], InputError> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| InputError::MissingColumn {
                column: name.to_string(),
            })
    }

    pub fn column_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.columns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn require_bars(&self, minimum: usize) -> Result<(), InputError> {
        if self.bars.len() < minimum {
            return Err(InputError::InsufficientBars {
                bars: self.bars.len(),
                minimum,
            });
        }
        Ok(())
    }
}
