//! Bollinger band breach with volume confirmation.
//!
//! Enters Long when the close crosses down through the lower band on
//! above-average volume, and Short when it crosses up through the upper band.
//! A Long exits once the close is back above the lower band; a Short exits
//! once it is back below the upper band. Bars outside the session window
//! carry no instruction.
//!
//! Reads precomputed columns `Bollinger_Upper_20_2`, `Bollinger_Lower_20_2`
//! and `Volume_SMA_20`.

use super::{config_section, positive_param, SignalSource};
use crate::domain::bar::{Bar, BarTable};
use crate::domain::error::StratbenchError;
use crate::domain::position::Position;
use crate::domain::signal::{Direction, Signal};
use crate::ports::config_port::ConfigPort;
use chrono::{NaiveTime, Timelike};

pub const ID: &str = "bollinger_volume";
pub const UPPER_COLUMN: &str = "Bollinger_Upper_20_2";
pub const LOWER_COLUMN: &str = "Bollinger_Lower_20_2";
pub const VOLUME_SMA_COLUMN: &str = "Volume_SMA_20";

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerVolume {
    /// Volume must exceed this multiple of its moving average.
    pub volume_threshold: f64,
    pub session_start: NaiveTime,
    /// Inclusive, at minute resolution.
    pub session_end: NaiveTime,
}

impl Default for BollingerVolume {
    fn default() -> Self {
        BollingerVolume {
            volume_threshold: 1.5,
            session_start: NaiveTime::MIN,
            session_end: NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl BollingerVolume {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StratbenchError> {
        let defaults = Self::default();
        Ok(BollingerVolume {
            volume_threshold: positive_param(
                config,
                ID,
                "volume_threshold",
                defaults.volume_threshold,
            )?,
            session_start: time_param(config, "session_start", defaults.session_start)?,
            session_end: time_param(config, "session_end", defaults.session_end)?,
        })
    }

    fn in_session(&self, time: NaiveTime) -> bool {
        let minute = NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time);
        if self.session_start <= self.session_end {
            self.session_start <= minute && minute <= self.session_end
        } else {
            // Overnight window, e.g. 22:00-04:00.
            minute >= self.session_start || minute <= self.session_end
        }
    }

    fn evaluate(&self, bars: &[Bar], i: usize, bands: &Bands<'_>, held: Position) -> Signal {
        let bar = &bars[i];
        let volume_confirmed = bar.volume > bands.volume_sma[i] * self.volume_threshold;

        let entry = match i.checked_sub(1) {
            Some(p) if volume_confirmed => {
                let prev_close = bars[p].close;
                if bar.close < bands.lower[i] && prev_close >= bands.lower[p] {
                    Some(Direction::Long)
                } else if bar.close > bands.upper[i] && prev_close <= bands.upper[p] {
                    Some(Direction::Short)
                } else {
                    None
                }
            }
            _ => None,
        };

        let exit = match held {
            Position::Long => bar.close > bands.lower[i],
            Position::Short => bar.close < bands.upper[i],
            Position::Flat => false,
        };

        Signal { entry, exit }
    }
}

struct Bands<'a> {
    upper: &'a [f64],
    lower: &'a [f64],
    volume_sma: &'a [f64],
}

fn time_param(
    config: &dyn ConfigPort,
    key: &str,
    default: NaiveTime,
) -> Result<NaiveTime, StratbenchError> {
    let section = config_section(ID);
    match config.get_string(&section, key) {
        None => Ok(default),
        Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S"))
            .map_err(|_| StratbenchError::ConfigInvalid {
                section,
                key: key.to_string(),
                reason: format!("invalid time {raw:?} (expected HH:MM)"),
            }),
    }
}

pub fn boxed(config: &dyn ConfigPort) -> Result<Box<dyn SignalSource>, StratbenchError> {
    Ok(Box::new(BollingerVolume::from_config(config)?))
}

impl SignalSource for BollingerVolume {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "Bollinger Volume Strategy"
    }

    fn generate_signals(&self, table: &BarTable) -> Result<Vec<Signal>, StratbenchError> {
        let bands = Bands {
            upper: table.column(UPPER_COLUMN)?,
            lower: table.column(LOWER_COLUMN)?,
            volume_sma: table.column(VOLUME_SMA_COLUMN)?,
        };
        let bars = table.bars();

        let mut held = Position::Flat;
        let mut signals = Vec::with_capacity(bars.len());
        for (i, bar) in bars.iter().enumerate() {
            let signal = if self.in_session(bar.timestamp.time()) {
                self.evaluate(bars, i, &bands, held)
            } else {
                Signal::HOLD
            };
            held = held.apply(signal);
            signals.push(signal);
        }
        Ok(signals)
    }
}
