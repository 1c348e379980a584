//! Universe read from a `symbol,sector,index` CSV file.
//!
//! The file is produced by a separate listing job. Symbols that do not
//! normalise to a plausible ticker are skipped with a warning.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::error::TurtleError;
use crate::domain::universe::Universe;
use crate::ports::universe_port::UniversePort;

#[derive(Debug, Deserialize)]
struct UniverseRow {
    symbol: String,
    #[serde(default)]
    sector: Option<String>,
    index: String,
}

pub struct UniverseFileAdapter {
    path: PathBuf,
}

impl UniverseFileAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl UniversePort for UniverseFileAdapter {
    fn load_universe(&self) -> Result<Universe, TurtleError> {
        let content = fs::read_to_string(&self.path).map_err(|e| TurtleError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut universe = Universe::new();
        for result in rdr.deserialize::<UniverseRow>() {
            let row = result.map_err(|e| TurtleError::Data {
                reason: format!("{}: CSV parse error: {}", self.path.display(), e),
            })?;
            if !universe.insert(&row.index, &row.symbol, row.sector.as_deref()) {
                warn!(symbol = %row.symbol, index = %row.index, "skipping invalid symbol");
            }
        }

        for index in universe.index_names() {
            info!(index, tickers = universe.list_tickers(index).len(), "loaded index");
        }
        Ok(universe)
    }
}
