//! Batch evaluation over a ticker universe.
//!
//! Tickers are processed one at a time in lexical order. A failure for one
//! ticker is recorded against that ticker and the batch carries on; only an
//! empty universe stops the run.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult};
use crate::domain::error::{FailureKind, TickerError, TurtleError};
use crate::domain::position::Position;
use crate::domain::risk::RegimeInputs;
use crate::domain::signal::{evaluate_ticker, Decision, EvaluationContext};
use crate::domain::snapshot::MIN_BARS;
use crate::ports::data_port::DataPort;
use crate::ports::regime_port::RegimePort;

/// About one year of trading days.
pub const LOOKBACK_BARS: usize = 252;

pub const SP500_INDEX_TICKER: &str = "^GSPC";

#[derive(Debug, Clone, PartialEq)]
pub struct TickerOutcome {
    pub ticker: String,
    pub result: Result<Decision, TickerError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestOutcome {
    pub ticker: String,
    pub result: Result<BacktestResult, TickerError>,
}

#[derive(Debug, Clone)]
pub struct BacktestPlan {
    pub config: BacktestConfig,
    /// Number of tickers with usable data to backtest, in scan order.
    pub limit: usize,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub lookback: usize,
    pub backtest: Option<BacktestPlan>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            lookback: LOOKBACK_BARS,
            backtest: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
    pub outcomes: Vec<TickerOutcome>,
    pub backtests: Vec<BacktestOutcome>,
}

impl ScanResult {
    pub fn decisions(&self) -> Vec<Decision> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().cloned())
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &TickerError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.ticker.as_str(), e)))
    }

    pub fn failure_counts(&self) -> BTreeMap<FailureKind, usize> {
        let mut counts = BTreeMap::new();
        for (_, err) in self.failures() {
            *counts.entry(err.kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }
}

pub fn scan_universe(
    data: &dyn DataPort,
    tickers: &BTreeSet<String>,
    positions: &BTreeMap<String, Position>,
    ctx: &EvaluationContext<'_>,
    options: &ScanOptions,
) -> Result<ScanResult, TurtleError> {
    if tickers.is_empty() {
        return Err(TurtleError::EmptyUniverse);
    }
    info!(tickers = tickers.len(), lookback = options.lookback, "scanning universe");

    let mut result = ScanResult::default();
    for (i, ticker) in tickers.iter().enumerate() {
        debug!(ticker = %ticker, n = i + 1, of = tickers.len(), "fetching");
        let series = match data.fetch_daily_series(ticker, options.lookback) {
            Ok(series) => series,
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "data fetch failed");
                result.outcomes.push(TickerOutcome {
                    ticker: ticker.clone(),
                    result: Err(TickerError::Provider(e.to_string())),
                });
                continue;
            }
        };

        let outcome = evaluate_ticker(&series, positions.get(ticker), ctx);
        match &outcome {
            Ok(decision) => debug!(ticker = %ticker, signal = %decision.signal, "evaluated"),
            Err(e) => warn!(ticker = %ticker, kind = %e.kind(), error = %e, "evaluation failed"),
        }
        result.outcomes.push(TickerOutcome {
            ticker: ticker.clone(),
            result: outcome,
        });

        if let Some(plan) = &options.backtest {
            if series.len() >= MIN_BARS && result.backtests.len() < plan.limit {
                result.backtests.push(BacktestOutcome {
                    ticker: ticker.clone(),
                    result: run_backtest(&series, &plan.config),
                });
            }
        }
    }

    let counts = result.failure_counts();
    info!(
        succeeded = result.succeeded(),
        failed = result.outcomes.len() - result.succeeded(),
        backtests = result.backtests.len(),
        ?counts,
        "scan complete"
    );
    Ok(result)
}

/// Static values used when a regime fetch fails or returns nothing usable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeFallbacks {
    pub vix: f64,
    pub exchange_rate: f64,
    pub forward_pe: f64,
}

fn usable(name: &str, fetched: Result<f64, TurtleError>, fallback: f64) -> f64 {
    match fetched {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        Ok(v) => {
            warn!(input = name, value = v, fallback, "unusable regime value, using default");
            fallback
        }
        Err(e) => {
            warn!(input = name, error = %e, fallback, "regime fetch failed, using default");
            fallback
        }
    }
}

/// Fetches the run's regime inputs once. Never fails.
pub fn load_regime(port: &dyn RegimePort, fallbacks: &RegimeFallbacks) -> RegimeInputs {
    let regime = RegimeInputs {
        vix_value: usable("vix", port.fetch_vix(), fallbacks.vix),
        exchange_rate_krw_usd: usable(
            "exchange_rate",
            port.fetch_exchange_rate(),
            fallbacks.exchange_rate,
        ),
        forward_pe: usable(
            "forward_pe",
            port.fetch_forward_pe(SP500_INDEX_TICKER),
            fallbacks.forward_pe,
        ),
    };
    info!(
        vix = regime.vix_value,
        exchange_rate = regime.exchange_rate_krw_usd,
        forward_pe = regime.forward_pe,
        "regime inputs"
    );
    regime
}
