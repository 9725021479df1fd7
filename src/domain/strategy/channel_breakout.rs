//! Price channel breakout over the previous `lookback` bars.
//!
//! Enters Long when the close exceeds the highest high of the previous
//! `lookback` bars and Short when it falls below their lowest low. An open
//! position exits when the close crosses back through the channel midpoint.
//! Works from OHLC alone; the channel is computed from bars strictly before
//! the one being evaluated.

use super::{period_param, SignalSource};
use crate::domain::bar::{Bar, BarTable};
use crate::domain::error::StratbenchError;
use crate::domain::position::Position;
use crate::domain::signal::{Direction, Signal};
use crate::ports::config_port::ConfigPort;

pub const ID: &str = "channel_breakout";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelBreakout {
    pub lookback: usize,
}

impl Default for ChannelBreakout {
    fn default() -> Self {
        ChannelBreakout { lookback: 20 }
    }
}

impl ChannelBreakout {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StratbenchError> {
        Ok(ChannelBreakout {
            lookback: period_param(config, ID, "lookback", Self::default().lookback)?,
        })
    }
}

/// Highest high and lowest low of `window`.
fn channel(window: &[Bar]) -> (f64, f64) {
    window.iter().fold(
        (f64::NEG_INFINITY, f64::INFINITY),
        |(hi, lo), bar| (hi.max(bar.high), lo.min(bar.low)),
    )
}

pub fn boxed(config: &dyn ConfigPort) -> Result<Box<dyn SignalSource>, StratbenchError> {
    Ok(Box::new(ChannelBreakout::from_config(config)?))
}

impl SignalSource for ChannelBreakout {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "Channel Breakout"
    }

    fn generate_signals(&self, table: &BarTable) -> Result<Vec<Signal>, StratbenchError> {
        table.require_bars(self.lookback + 1)?;
        let bars = table.bars();

        let mut held = Position::Flat;
        let mut signals = Vec::with_capacity(bars.len());
        for (i, bar) in bars.iter().enumerate() {
            let signal = if i < self.lookback {
                Signal::HOLD
            } else {
                let (upper, lower) = channel(&bars[i - self.lookback..i]);
                let mid = (upper + lower) / 2.0;
                let entry = if bar.close > upper {
                    Some(Direction::Long)
                } else if bar.close < lower {
                    Some(Direction::Short)
                } else {
                    None
                };
                let exit = match held {
                    Position::Long => bar.close < mid,
                    Position::Short => bar.close > mid,
                    Position::Flat => false,
                };
                Signal { entry, exit }
            };
            held = held.apply(signal);
            signals.push(signal);
        }
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{hourly_table, MapConfig};
    use super::*;
    use crate::domain::error::InputError;
    use crate::domain::position::{signs, simulate};

    #[test]
    fn breakout_long_then_midpoint_exit() {
        // After the breakout the channel is [99, 104], midpoint 101.5.
        let table = hourly_table(
            &[100.0, 100.0, 100.0, 103.0, 102.0, 100.0],
            &[1.0; 6],
        );
        let strategy = ChannelBreakout { lookback: 3 };
        let signals = strategy.generate_signals(&table).unwrap();
        assert_eq!(signals[3], Signal::enter(Direction::Long));
        assert_eq!(signs(&simulate(&signals)), vec![0, 0, 0, 1, 1, 0]);
    }

    #[test]
    fn breakdown_enters_short() {
        let table = hourly_table(&[100.0, 100.0, 100.0, 97.0], &[1.0; 4]);
        let strategy = ChannelBreakout { lookback: 3 };
        let signals = strategy.generate_signals(&table).unwrap();
        assert_eq!(signals[3], Signal::enter(Direction::Short));
    }

    #[test]
    fn warmup_bars_are_holds() {
        let table = hourly_table(&[100.0, 150.0, 200.0, 200.5], &[1.0; 4]);
        let strategy = ChannelBreakout { lookback: 3 };
        let signals = strategy.generate_signals(&table).unwrap();
        assert!(signals[..3].iter().all(|s| s.is_hold()));
    }

    #[test]
    fn too_few_bars_is_input_error() {
        let table = hourly_table(&[100.0, 101.0], &[1.0, 1.0]);
        let err = ChannelBreakout::default().generate_signals(&table).unwrap_err();
        assert!(matches!(
            err,
            StratbenchError::Input(InputError::InsufficientBars { bars: 2, minimum: 21 })
        ));
    }

    #[test]
    fn from_config_reads_lookback() {
        let config = MapConfig::default().with("strategy.channel_breakout", "lookback", "55");
        assert_eq!(ChannelBreakout::from_config(&config).unwrap().lookback, 55);
    }
}
