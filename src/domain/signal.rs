//! Per-bar strategy signals.
//!
//! A [`Signal`] carries two independent channels: an optional entry
//! direction and an exit flag. Keeping them apart removes the ambiguity of a
//! single {-1, 0, +1} series where 0 means both "no opinion" and "go flat".
//! The single-series encoding is still accepted through
//! [`Signal::from_direction`], where 0 is always "no new instruction".

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn sign(self) -> i8 {
        match self {
            Direction::Long => 1,
            Direction::Short => -1,
        }
    }

    /// Positive values map to `Long`, negative to `Short`, zero to `None`.
    pub fn from_sign(value: i8) -> Option<Self> {
        match value {
            v if v > 0 => Some(Direction::Long),
            v if v < 0 => Some(Direction::Short),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signal {
    pub entry: Option<Direction>,
    pub exit: bool,
}

impl Signal {
    pub const HOLD: Signal = Signal {
        entry: None,
        exit: false,
    };

    pub const EXIT: Signal = Signal {
        entry: None,
        exit: true,
    };

    pub const fn enter(direction: Direction) -> Self {
        Signal {
            entry: Some(direction),
            exit: false,
        }
    }

    pub fn from_direction(value: i8) -> Self {
        match Direction::from_sign(value) {
            Some(direction) => Signal::enter(direction),
            None => Signal::HOLD,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.entry.is_none() && !self.exit
    }
}

pub fn signals_from_directions(directions: &[i8]) -> Vec<Signal> {
    directions.iter().map(|&d| Signal::from_direction(d)).collect()
}
