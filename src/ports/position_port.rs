//! Position store port. Read-only: the engine never writes positions back.

use std::collections::BTreeMap;

use crate::domain::error::TurtleError;
use crate::domain::position::Position;

pub trait PositionPort {
    /// Positions keyed by ticker. A store that does not exist yet is empty.
    fn load_positions(&self) -> Result<BTreeMap<String, Position>, TurtleError>;
}
