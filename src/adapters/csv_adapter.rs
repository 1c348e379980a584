//! CSV file market data adapter.
//!
//! Reads `<TICKER>.csv` files with a `date,open,high,low,close,volume`
//! header from one directory. Empty fields are filled from the previous bar
//! in a single forward pass; rows before the first complete bar are dropped.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::domain::error::TurtleError;
use crate::domain::ohlcv::{PriceBar, PriceSeries};
use crate::ports::data_port::DataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

impl CsvRow {
    fn fill_from(&self, date: NaiveDate, prev: Option<&PriceBar>) -> Option<PriceBar> {
        let pick = |value: Option<f64>, from_prev: fn(&PriceBar) -> f64| {
            value.or_else(|| prev.map(from_prev))
        };
        Some(PriceBar {
            date,
            open: pick(self.open, |b| b.open)?,
            high: pick(self.high, |b| b.high)?,
            low: pick(self.low, |b| b.low)?,
            close: pick(self.close, |b| b.close)?,
            volume: pick(self.volume, |b| b.volume)?,
        })
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{ticker}.csv"))
    }

    /// Every bar in the file, oldest first.
    pub fn read_series(&self, ticker: &str) -> Result<PriceSeries, TurtleError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| TurtleError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut rows = Vec::new();
        for result in rdr.deserialize::<CsvRow>() {
            let row = result.map_err(|e| TurtleError::Data {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;
            let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| {
                TurtleError::Data {
                    reason: format!("{}: invalid date '{}': {}", path.display(), row.date, e),
                }
            })?;
            rows.push((date, row));
        }
        rows.sort_by_key(|(date, _)| *date);

        let mut bars: Vec<PriceBar> = Vec::with_capacity(rows.len());
        let mut dropped = 0usize;
        for (date, row) in &rows {
            match row.fill_from(*date, bars.last()) {
                Some(bar) => {
                    // a repeated date replaces the earlier row
                    if bars.last().is_some_and(|b| b.date == *date) {
                        bars.pop();
                    }
                    bars.push(bar);
                }
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            debug!(ticker, dropped, "dropped leading incomplete rows");
        }

        Ok(PriceSeries::new(ticker, bars))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_daily_series(&self, ticker: &str, lookback: usize) -> Result<PriceSeries, TurtleError> {
        let mut series = self.read_series(ticker)?;
        if series.is_empty() {
            return Err(TurtleError::NoData {
                ticker: ticker.to_string(),
            });
        }
        if series.bars.len() > lookback {
            series.bars.drain(..series.bars.len() - lookback);
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n";
        fs::write(path.join("AAPL.csv"), csv_content).unwrap();

        let gaps = "date,open,high,low,close,volume\n\
            2024-01-12,,,,,\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-16,,,,,\n\
            2024-01-17,106.0,112.0,101.0,,\n";
        fs::write(path.join("BRK-B.csv"), gaps).unwrap();

        fs::write(path.join("EMPTY.csv"), "date,open,high,low,close,volume\n").unwrap();
        fs::write(
            path.join("BAD.csv"),
            "date,open,high,low,close,volume\n2024-01-15,abc,1,1,1,1\n",
        )
        .unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_returns_sorted_bars() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let series = adapter.fetch_daily_series("AAPL", 252).unwrap();

        assert_eq!(series.ticker, "AAPL");
        assert_eq!(series.len(), 3);
        assert_eq!(series.bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(series.bars[1].close, 110.0);
        assert_eq!(series.bars[2].volume, 55000.0);
    }

    #[test]
    fn lookback_keeps_latest_bars() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let series = adapter.fetch_daily_series("AAPL", 2).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
    }

    #[test]
    fn gaps_are_forward_filled_once() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let series = adapter.fetch_daily_series("BRK-B", 252).unwrap();

        // leading empty row has nothing to fill from
        assert_eq!(series.len(), 3);
        assert_eq!(series.bars[1].close, 105.0);
        assert_eq!(series.bars[1].volume, 50000.0);
        assert_eq!(series.bars[2].open, 106.0);
        assert_eq!(series.bars[2].close, 105.0);
    }

    #[test]
    fn missing_file_is_an_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(matches!(
            adapter.fetch_daily_series("XYZ", 252),
            Err(TurtleError::Data { .. })
        ));
    }

    #[test]
    fn empty_file_is_no_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(matches!(
            adapter.fetch_daily_series("EMPTY", 252),
            Err(TurtleError::NoData { .. })
        ));
    }

    #[test]
    fn malformed_number_is_an_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(adapter.fetch_daily_series("BAD", 252).is_err());
    }
}
