//! Trade reconstruction and trade statistics.
//!
//! Trades are rebuilt from the position timeline: a trade opens on the first
//! nonzero bar after a flat bar and closes on the next flat bar, both priced
//! at that bar's close. A direct reversal (Long straight to Short) never
//! passes through Flat and so stays one trade, priced in its opening
//! direction.
//!
//! Durations come from a second scan over timestamps that shares no state
//! with the pricing scan; the two must agree on the number of trades.

use super::bar::Bar;
use super::error::ComputationError;
use super::position::Position;
use super::signal::Direction;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub direction: Direction,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    /// Closed at the last bar because the series ended with it open.
    pub forced_close: bool,
}

impl Trade {
    pub fn trade_return(&self) -> f64 {
        (self.exit_price - self.entry_price) / self.entry_price * f64::from(self.direction.sign())
    }

    pub fn duration_minutes(&self) -> f64 {
        minutes_between(self.entry_time, self.exit_time)
    }
}

fn minutes_between(entry: NaiveDateTime, exit: NaiveDateTime) -> f64 {
    (exit - entry).num_seconds() as f64 / 60.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeStats {
    /// Number of round trips in the trade list.
    pub completed_trade_count: usize,
    /// Number of bars spent in the market (nonzero position).
    pub signal_event_count: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    /// Fraction of completed trades with a positive return.
    pub win_rate: f64,
    pub profit_factor: f64,
    /// Mean holding time in minutes.
    pub avg_trade_duration: f64,
    /// The series ended with a position still open.
    pub open_at_end: bool,
}

impl TradeStats {
    fn compute(
        trades: &[Trade],
        durations: &[f64],
        signal_event_count: usize,
        open_at_end: bool,
    ) -> Self {
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;

        for trade in trades {
            let r = trade.trade_return();
            if r > 0.0 {
                trades_won += 1;
                gross_profit += r;
            } else if r < 0.0 {
                trades_lost += 1;
                gross_loss += r;
            }
        }

        let completed_trade_count = trades.len();
        let win_rate = if completed_trade_count > 0 {
            trades_won as f64 / completed_trade_count as f64
        } else {
            0.0
        };

        let profit_factor = if trades_lost > 0 {
            gross_profit / gross_loss.abs()
        } else {
            f64::INFINITY
        };

        let avg_trade_duration = if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<f64>() / durations.len() as f64
        };

        TradeStats {
            completed_trade_count,
            signal_event_count,
            trades_won,
            trades_lost,
            win_rate,
            profit_factor,
            avg_trade_duration,
            open_at_end,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TradeAnalyzer {
    force_close_at_end: bool,
}

impl TradeAnalyzer {
    /// With `force_close_at_end` unset, a position still open at the last bar
    /// produces no trade.
    pub fn new(force_close_at_end: bool) -> Self {
        Self { force_close_at_end }
    }

    pub fn extract(
        &self,
        position: &[Position],
        bars: &[Bar],
    ) -> Result<(Vec<Trade>, TradeStats), ComputationError> {
        if position.len() != bars.len() {
            return Err(ComputationError::Misaligned {
                positions: position.len(),
                bars: bars.len(),
            });
        }

        let trades = self.price_scan(position, bars);
        let durations = self.duration_scan(position, bars);
        if trades.len() != durations.len() {
            return Err(ComputationError::ScanMismatch {
                price_scan: trades.len(),
                duration_scan: durations.len(),
            });
        }

        let signal_event_count = position.iter().filter(|p| !p.is_flat()).count();
        let open_at_end = position.last().is_some_and(|p| !p.is_flat());
        let stats = TradeStats::compute(&trades, &durations, signal_event_count, open_at_end);

        Ok((trades, stats))
    }

    fn price_scan(&self, position: &[Position], bars: &[Bar]) -> Vec<Trade> {
        let mut trades = Vec::new();
        let mut open: Option<(Direction, &Bar)> = None;

        for (pos, bar) in position.iter().zip(bars) {
            match (open, pos.direction()) {
                (None, Some(direction)) => open = Some((direction, bar)),
                (Some((direction, entry)), None) => {
                    trades.push(close_trade(direction, entry, bar, false));
                    open = None;
                }
                _ => {}
            }
        }

        if let (Some((direction, entry)), Some(last), true) =
            (open, bars.last(), self.force_close_at_end)
        {
            trades.push(close_trade(direction, entry, last, true));
        }

        trades
    }

    fn duration_scan(&self, position: &[Position], bars: &[Bar]) -> Vec<f64> {
        let mut durations = Vec::new();
        let mut entry_time: Option<NaiveDateTime> = None;

        for (pos, bar) in position.iter().zip(bars) {
            match entry_time {
                None if !pos.is_flat() => entry_time = Some(bar.timestamp),
                Some(entered) if pos.is_flat() => {
                    durations.push(minutes_between(entered, bar.timestamp));
                    entry_time = None;
                }
                _ => {}
            }
        }

        if let (Some(entered), Some(last), true) =
            (entry_time, bars.last(), self.force_close_at_end)
        {
            durations.push(minutes_between(entered, last.timestamp));
        }

        durations
    }
}

fn close_trade(direction: Direction, entry: &Bar, exit: &Bar, forced_close: bool) -> Trade {
    Trade {
        direction,
        entry_time: entry.timestamp,
        entry_price: entry.close,
        exit_time: exit.timestamp,
        exit_price: exit.close,
        forced_close,
    }
}
