//! Market regime data port.
//!
//! Each fetch may fail independently; callers fall back to static defaults.

use crate::domain::error::TurtleError;

pub trait RegimePort {
    fn fetch_vix(&self) -> Result<f64, TurtleError>;

    /// KRW per USD.
    fn fetch_exchange_rate(&self) -> Result<f64, TurtleError>;

    fn fetch_forward_pe(&self, index_ticker: &str) -> Result<f64, TurtleError>;
}
