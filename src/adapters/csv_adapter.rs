//! CSV bar table adapter.
//!
//! Expects a header row with `timestamp, open, high, low, close, volume`.
//! Every other column is loaded as a numeric indicator column; empty cells
//! become NaN.

use crate::domain::bar::{Bar, BarTable};
use crate::domain::error::{InputError, StratbenchError};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;
use std::path::{Path, PathBuf};
use tracing::info;

const TIMESTAMP_COLUMN: &str = "timestamp";
const PRICE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

pub struct CsvBarAdapter {
    path: PathBuf,
}

impl CsvBarAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn data_error(&self, err: impl std::fmt::Display) -> StratbenchError {
        StratbenchError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), err),
        }
    }
}

struct Layout {
    timestamp: usize,
    prices: [usize; 5],
    indicators: Vec<(usize, String)>,
}

impl Layout {
    fn from_headers(headers: &StringRecord) -> Result<Self, InputError> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| InputError::MissingColumn {
                    column: name.to_string(),
                })
        };

        let timestamp = position(TIMESTAMP_COLUMN)?;
        let mut prices = [0usize; 5];
        for (slot, name) in prices.iter_mut().zip(PRICE_COLUMNS) {
            *slot = position(name)?;
        }

        let indicators = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != timestamp && !prices.contains(i))
            .map(|(i, name)| (i, name.trim().to_string()))
            .collect();

        Ok(Self {
            timestamp,
            prices,
            indicators,
        })
    }
}

/// Parses a bar timestamp. A trailing UTC marker (`Z` or `+00:00`) is
/// accepted and dropped; date-only values map to midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    let value = trimmed
        .strip_suffix('Z')
        .or_else(|| trimmed.strip_suffix("+00:00"))
        .unwrap_or(trimmed);

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn field<'r>(record: &'r StringRecord, index: usize) -> &'r str {
    record.get(index).unwrap_or("").trim()
}

fn parse_price(record: &StringRecord, index: usize, column: &str, row: usize) -> Result<f64, InputError> {
    let raw = field(record, index);
    raw.parse::<f64>().map_err(|_| InputError::Malformed {
        reason: format!("row {row}: invalid {column} value {raw:?}"),
    })
}

fn parse_indicator(raw: &str, column: &str, row: usize) -> Result<f64, InputError> {
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>().map_err(|_| InputError::Malformed {
        reason: format!("row {row}: invalid {column} value {raw:?}"),
    })
}

impl DataPort for CsvBarAdapter {
    fn load_bars(&self) -> Result<BarTable, StratbenchError> {
        let mut rdr = csv::Reader::from_path(&self.path).map_err(|e| self.data_error(e))?;
        let headers = rdr.headers().map_err(|e| self.data_error(e))?.clone();
        let layout = Layout::from_headers(&headers)?;

        let mut rows: Vec<(Bar, Vec<f64>)> = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.data_error(e))?;
            // 1-based data row, header excluded.
            let row = i + 1;

            let raw_ts = field(&record, layout.timestamp);
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| InputError::Malformed {
                reason: format!("row {row}: invalid timestamp {raw_ts:?}"),
            })?;

            let [open, high, low, close, volume] = layout.prices;
            let bar = Bar {
                timestamp,
                open: parse_price(&record, open, "open", row)?,
                high: parse_price(&record, high, "high", row)?,
                low: parse_price(&record, low, "low", row)?,
                close: parse_price(&record, close, "close", row)?,
                volume: parse_price(&record, volume, "volume", row)?,
            };

            let values = layout
                .indicators
                .iter()
                .map(|(index, name)| parse_indicator(field(&record, *index), name, row))
                .collect::<Result<Vec<f64>, InputError>>()?;

            rows.push((bar, values));
        }

        rows.sort_by_key(|(bar, _)| bar.timestamp);

        let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(rows.len()); layout.indicators.len()];
        let mut bars = Vec::with_capacity(rows.len());
        for (bar, values) in rows {
            for (column, value) in columns.iter_mut().zip(values) {
                column.push(value);
            }
            bars.push(bar);
        }

        let mut table = BarTable::new(bars)?;
        for ((_, name), values) in layout.indicators.iter().zip(columns) {
            table = table.with_column(name.clone(), values)?;
        }

        info!(
            path = %self.path.display(),
            bars = table.len(),
            indicators = layout.indicators.len(),
            "loaded bar table"
        );
        Ok(table)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
