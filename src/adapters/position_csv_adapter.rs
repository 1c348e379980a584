//! Position store backed by a `ticker,buy_date,buy_price,units` CSV file.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::domain::error::TurtleError;
use crate::domain::position::Position;
use crate::domain::universe::normalize_ticker;
use crate::ports::position_port::PositionPort;

#[derive(Debug, Deserialize)]
struct PositionRow {
    ticker: String,
    buy_date: String,
    buy_price: f64,
    units: u32,
}

pub struct PositionCsvAdapter {
    path: PathBuf,
}

impl PositionCsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn data_error(&self, reason: impl std::fmt::Display) -> TurtleError {
        TurtleError::Data {
            reason: format!("{}: {}", self.path.display(), reason),
        }
    }
}

impl PositionPort for PositionCsvAdapter {
    fn load_positions(&self) -> Result<BTreeMap<String, Position>, TurtleError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no positions file, starting flat");
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(self.data_error(e)),
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut positions = BTreeMap::new();
        for result in rdr.deserialize::<PositionRow>() {
            let row = result.map_err(|e| self.data_error(e))?;
            let ticker = normalize_ticker(&row.ticker)
                .ok_or_else(|| self.data_error(format!("invalid ticker '{}'", row.ticker)))?;
            let buy_date = NaiveDate::parse_from_str(&row.buy_date, "%Y-%m-%d")
                .map_err(|e| self.data_error(format!("invalid buy_date '{}': {}", row.buy_date, e)))?;
            if !(row.buy_price.is_finite() && row.buy_price > 0.0) {
                return Err(self.data_error(format!("invalid buy_price for {ticker}")));
            }
            positions.insert(
                ticker.clone(),
                Position {
                    ticker,
                    buy_date,
                    buy_price: row.buy_price,
                    units: row.units,
                },
            );
        }

        info!(positions = positions.len(), "loaded positions");
        Ok(positions)
    }
}
