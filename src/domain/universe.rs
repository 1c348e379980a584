//! Ticker universe: index membership and sector lookup.
//!
//! Symbols are normalised on the way in (trimmed, upper-cased, `.` replaced
//! with `-`) so every index lists the same spelling of a ticker. Iteration is
//! always lexical, which makes the sector-capped aggregation reproducible.

use std::collections::{BTreeMap, BTreeSet};

pub const MAX_TICKER_LEN: usize = 10;

pub const SP500: &str = "sp500";
pub const NASDAQ100: &str = "nasdaq100";

/// Display name for an index key.
pub fn index_label(index: &str) -> &str {
    match index {
        SP500 => "S&P500",
        NASDAQ100 => "NASDAQ100",
        other => other,
    }
}

/// Returns the canonical spelling of a symbol, or `None` if it is not a
/// plausible ticker.
pub fn normalize_ticker(raw: &str) -> Option<String> {
    let ticker = raw.trim().replace('.', "-").to_uppercase();
    if ticker.is_empty() || ticker.len() > MAX_TICKER_LEN || ticker.contains(char::is_whitespace) {
        return None;
    }
    Some(ticker)
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum UniverseError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("invalid ticker: {0}")]
    InvalidTicker(String),

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),
}

/// Parses a comma-separated ticker list such as `AAPL, brk.b,MSFT`.
pub fn parse_tickers(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut tickers = Vec::new();
    let mut seen = BTreeSet::new();

    for token in input.split(',') {
        if token.trim().is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let ticker = normalize_ticker(token)
            .ok_or_else(|| UniverseError::InvalidTicker(token.trim().to_string()))?;
        if !seen.insert(ticker.clone()) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Universe {
    indices: BTreeMap<String, BTreeSet<String>>,
    sectors: BTreeMap<String, String>,
}

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a symbol to an index. Returns false if the symbol was rejected.
    /// The first non-empty sector seen for a ticker wins.
    pub fn insert(&mut self, index: &str, raw_symbol: &str, sector: Option<&str>) -> bool {
        let Some(ticker) = normalize_ticker(raw_symbol) else {
            return false;
        };
        if let Some(sector) = sector.map(str::trim).filter(|s| !s.is_empty()) {
            self.sectors
                .entry(ticker.clone())
                .or_insert_with(|| sector.to_string());
        }
        self.indices
            .entry(index.trim().to_lowercase())
            .or_default()
            .insert(ticker);
        true
    }

    pub fn index_names(&self) -> impl Iterator<Item = &str> {
        self.indices.keys().map(String::as_str)
    }

    pub fn list_tickers(&self, index: &str) -> BTreeSet<String> {
        self.indices.get(index).cloned().unwrap_or_default()
    }

    /// Deduplicated union of every index, in lexical order.
    pub fn all_tickers(&self) -> BTreeSet<String> {
        self.indices.values().flatten().cloned().collect()
    }

    pub fn sector_of(&self, ticker: &str) -> Option<&str> {
        self.sectors.get(ticker).map(String::as_str)
    }

    pub fn sectors(&self) -> &BTreeMap<String, String> {
        &self.sectors
    }

    /// Keeps only the given tickers, across every index.
    pub fn restrict_to(&mut self, tickers: &[String]) {
        let keep: BTreeSet<&String> = tickers.iter().collect();
        for members in self.indices.values_mut() {
            members.retain(|t| keep.contains(t));
        }
        self.indices.retain(|_, members| !members.is_empty());
    }

    pub fn count(&self) -> usize {
        self.all_tickers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.values().all(BTreeSet::is_empty)
    }
}
