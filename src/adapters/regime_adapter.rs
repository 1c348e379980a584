//! Regime inputs read from the same CSV price directory as tickers.
//!
//! VIX and the USD/KRW rate are the last close of `^VIX.csv` and `KRW=X.csv`.
//! There is no P/E history on disk, so the forward P/E is the configured
//! value.

use crate::adapters::csv_adapter::CsvAdapter;
use crate::domain::error::TurtleError;
use crate::ports::regime_port::RegimePort;

pub const VIX_TICKER: &str = "^VIX";
pub const USD_KRW_TICKER: &str = "KRW=X";

pub struct CsvRegimeAdapter {
    prices: CsvAdapter,
    forward_pe: f64,
}

impl CsvRegimeAdapter {
    pub fn new(prices: CsvAdapter, forward_pe: f64) -> Self {
        Self { prices, forward_pe }
    }

    fn last_close(&self, ticker: &str) -> Result<f64, TurtleError> {
        let series = self.prices.read_series(ticker)?;
        series
            .last()
            .map(|bar| bar.close)
            .ok_or_else(|| TurtleError::NoData {
                ticker: ticker.to_string(),
            })
    }
}

impl RegimePort for CsvRegimeAdapter {
    fn fetch_vix(&self) -> Result<f64, TurtleError> {
        self.last_close(VIX_TICKER)
    }

    fn fetch_exchange_rate(&self) -> Result<f64, TurtleError> {
        self.last_close(USD_KRW_TICKER)
    }

    fn fetch_forward_pe(&self, _index_ticker: &str) -> Result<f64, TurtleError> {
        Ok(self.forward_pe)
    }
}
