//! Bar-level and daily strategy returns.
//!
//! The strategy return at bar `t` uses the position established at the close
//! of bar `t - 1`, so a signal seen at bar `t` only earns from bar `t + 1`.

use super::bar::Bar;
use super::error::ComputationError;
use super::position::Position;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyReturn {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarReturns {
    /// `close[t] / close[t-1] - 1`; `None` at the first bar.
    pub price_returns: Vec<Option<f64>>,
    pub strategy_returns: Vec<f64>,
    /// Sum of intraday strategy returns per calendar date, in date order.
    pub daily: Vec<DailyReturn>,
}

impl BarReturns {
    pub fn compute(position: &[Position], bars: &[Bar]) -> Result<Self, ComputationError> {
        if position.len() != bars.len() {
            return Err(ComputationError::Misaligned {
                positions: position.len(),
                bars: bars.len(),
            });
        }

        let mut price_returns = Vec::with_capacity(bars.len());
        let mut strategy_returns = Vec::with_capacity(bars.len());

        for (t, bar) in bars.iter().enumerate() {
            if t == 0 {
                price_returns.push(None);
                strategy_returns.push(0.0);
                continue;
            }
            let price_return = bar.close / bars[t - 1].close - 1.0;
            price_returns.push(Some(price_return));

            // Flat bars earn exactly nothing, even across a bad price print.
            let held = position[t - 1].sign();
            let strategy_return = if held == 0 {
                0.0
            } else {
                f64::from(held) * price_return
            };
            strategy_returns.push(strategy_return);
        }

        let daily = aggregate_daily(bars, &strategy_returns);

        Ok(Self {
            price_returns,
            strategy_returns,
            daily,
        })
    }

    pub fn daily_values(&self) -> Vec<f64> {
        self.daily.iter().map(|d| d.value).collect()
    }
}

fn aggregate_daily(bars: &[Bar], strategy_returns: &[f64]) -> Vec<DailyReturn> {
    let mut daily: Vec<DailyReturn> = Vec::new();
    for (bar, &r) in bars.iter().zip(strategy_returns) {
        let date = bar.date();
        match daily.last_mut() {
            Some(day) if day.date == date => day.value += r,
            _ => daily.push(DailyReturn { date, value: r }),
        }
    }
    daily
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::simulate_directions;

    fn make_bars(closes: &[f64], bars_per_day: usize) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let day = (i / bars_per_day) as i64;
                let hour = (i % bars_per_day) as i64;
                Bar {
                    timestamp: start
                        + chrono::Duration::days(day)
                        + chrono::Duration::hours(hour),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 1.0,
                }
            })
            .collect()
    }

    #[test]
    fn first_bar_has_no_return() {
        let bars = make_bars(&[100.0, 110.0], 1);
        let returns = BarReturns::compute(&simulate_directions(&[1, 1]), &bars).unwrap();
        assert_eq!(returns.price_returns[0], None);
        assert_eq!(returns.strategy_returns[0], 0.0);
    }

    #[test]
    fn uses_previous_bar_position() {
        let bars = make_bars(&[100.0, 110.0, 99.0], 1);
        // Long only from the close of bar 1.
        let returns = BarReturns::compute(&simulate_directions(&[0, 1, 1]), &bars).unwrap();
        assert_eq!(returns.strategy_returns[1], 0.0);
        assert!((returns.strategy_returns[2] - (99.0 / 110.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn short_position_inverts_return() {
        let bars = make_bars(&[100.0, 90.0], 1);
        let returns = BarReturns::compute(&simulate_directions(&[-1, -1]), &bars).unwrap();
        assert!((returns.strategy_returns[1] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn flat_bar_ignores_zero_price() {
        let bars = make_bars(&[0.0, 10.0, 11.0], 1);
        let returns = BarReturns::compute(&simulate_directions(&[0, 1, 1]), &bars).unwrap();
        assert_eq!(returns.strategy_returns[1], 0.0);
        assert!(returns.price_returns[1].unwrap().is_infinite());
    }

    #[test]
    fn daily_sums_intraday_returns() {
        let bars = make_bars(&[100.0, 101.0, 102.0, 100.0], 2);
        let returns = BarReturns::compute(&simulate_directions(&[1, 0, 0, 0]), &bars).unwrap();
        assert_eq!(returns.daily.len(), 2);
        assert_eq!(returns.daily[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!((returns.daily[0].value - 0.01).abs() < 1e-12);
        let expected_day2 = (102.0 / 101.0 - 1.0) + (100.0 / 102.0 - 1.0);
        assert!((returns.daily[1].value - expected_day2).abs() < 1e-12);
        assert_eq!(returns.daily_values().len(), 2);
    }

    #[test]
    fn misaligned_inputs_rejected() {
        let bars = make_bars(&[100.0, 101.0], 1);
        let err = BarReturns::compute(&simulate_directions(&[1]), &bars).unwrap_err();
        assert_eq!(
            err,
            ComputationError::Misaligned {
                positions: 1,
                bars: 2
            }
        );
    }

    #[test]
    fn empty_series() {
        let returns = BarReturns::compute(&[], &[]).unwrap();
        assert!(returns.strategy_returns.is_empty());
        assert!(returns.daily.is_empty());
    }
}
