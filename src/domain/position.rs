//! Externally held positions and the state they imply.

use chrono::NaiveDate;

/// A position as recorded by the position store. Read-only to the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub ticker: String,
    pub buy_date: NaiveDate,
    pub buy_price: f64,
    /// 0 means flat.
    pub units: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionState {
    Flat,
    Holding { units: u32, entry_price: f64 },
}

impl PositionState {
    pub fn from_position(position: Option<&Position>) -> Self {
        match position {
            Some(p) if p.units > 0 => PositionState::Holding {
                units: p.units,
                entry_price: p.buy_price,
            },
            _ => PositionState::Flat,
        }
    }

    pub fn units(&self) -> u32 {
        match self {
            PositionState::Flat => 0,
            PositionState::Holding { units, .. } => *units,
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }
}
