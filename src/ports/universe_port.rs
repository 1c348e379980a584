//! Ticker universe port.

use std::collections::BTreeSet;

use crate::domain::error::TurtleError;
use crate::domain::universe::Universe;

pub trait UniversePort {
    fn load_universe(&self) -> Result<Universe, TurtleError>;

    fn list_tickers(&self, index: &str) -> Result<BTreeSet<String>, TurtleError> {
        Ok(self.load_universe()?.list_tickers(index))
    }
}
