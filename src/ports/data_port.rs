//! Market data port.

use crate::domain::error::TurtleError;
use crate::domain::ohlcv::PriceSeries;

pub trait DataPort {
    /// Returns up to `lookback` most recent daily bars, oldest first.
    fn fetch_daily_series(&self, ticker: &str, lookback: usize) -> Result<PriceSeries, TurtleError>;
}
