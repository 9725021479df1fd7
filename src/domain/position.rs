//! Position timeline simulation.
//!
//! The simulator is a three-state machine (Flat, Long, Short) driven by the
//! per-bar [`Signal`] series. Entries move to their direction from any state,
//! exits move to Flat, and holds carry the current state forward. A held
//! position never expires on its own.

use super::signal::{signals_from_directions, Direction, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Flat,
    Long,
    Short,
}

impl Position {
    pub fn is_long(self) -> bool {
        self == Position::Long
    }

    pub fn is_short(self) -> bool {
        self == Position::Short
    }

    pub fn is_flat(self) -> bool {
        self == Position::Flat
    }

    pub fn sign(self) -> i8 {
        match self {
            Position::Flat => 0,
            Position::Long => 1,
            Position::Short => -1,
        }
    }

    pub fn direction(self) -> Option<Direction> {
        match self {
            Position::Flat => None,
            Position::Long => Some(Direction::Long),
            Position::Short => Some(Direction::Short),
        }
    }

    /// State after applying one bar's signal. An entry on the same bar as an
    /// exit wins: the old position is closed and the new one opened.
    pub fn apply(self, signal: Signal) -> Position {
        match signal.entry {
            Some(direction) => direction.into(),
            None if signal.exit => Position::Flat,
            None => self,
        }
    }
}

impl From<Direction> for Position {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Long => Position::Long,
            Direction::Short => Position::Short,
        }
    }
}

/// Resolves a signal series into the position held from each bar's close.
pub fn simulate(signals: &[Signal]) -> Vec<Position> {
    let mut state = Position::Flat;
    signals
        .iter()
        .map(|&signal| {
            state = state.apply(signal);
            state
        })
        .collect()
}

/// [`simulate`] for callers holding a {-1, 0, +1} direction series.
pub fn simulate_directions(directions: &[i8]) -> Vec<Position> {
    simulate(&signals_from_directions(directions))
}

pub fn signs(positions: &[Position]) -> Vec<i8> {
    positions.iter().map(|p| p.sign()).collect()
}
