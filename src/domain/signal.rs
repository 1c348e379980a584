//! Turtle signal evaluation.
//!
//! The evaluator is stateless between runs: the position state is rebuilt
//! from the externally supplied [`Position`] and the next action is derived
//! from scratch.
//!
//! ```text
//! FLAT ──BUY──▶ HOLDING(1, close)
//! HOLDING(u, e) ──SELL──▶ FLAT                  close < e - 2*ATR or close < low_10
//! HOLDING(u, e) ──PYRAMID_BUY──▶ HOLDING(u+1, e) close > e + 0.5*ATR and u < max
//! ```
//!
//! While flat, a failed trend check produces [`Signal::WatchSell`], which is
//! informational only: there is nothing to liquidate.

use std::fmt;

use chrono::NaiveDate;

use crate::domain::error::TickerError;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::position::{Position, PositionState};
use crate::domain::risk::{RegimeInputs, RegimeThresholds, RiskConfig};
use crate::domain::sizing::{self, EntrySizing, HoldingLevels};
use crate::domain::snapshot::IndicatorSnapshot;

pub const RSI_OVERBOUGHT: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Buy,
    PyramidBuy,
    /// Exit an open holding.
    Sell,
    /// Exit conditions hold but there is no position; display only.
    WatchSell,
    Hold,
}

impl Signal {
    /// Whether the signal belongs in a report's sell listing.
    pub fn is_sell_like(&self) -> bool {
        matches!(self, Signal::Sell | Signal::WatchSell)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Signal::Buy => "BUY",
            Signal::PyramidBuy => "PYRAMID_BUY",
            Signal::Sell => "SELL",
            Signal::WatchSell => "SELL (no position)",
            Signal::Hold => "HOLD",
        };
        f.write_str(label)
    }
}

/// Staleness guard: the latest bar must be within `max_days` of `as_of`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Staleness {
    pub as_of: NaiveDate,
    pub max_days: i64,
}

/// Read-only inputs shared by every ticker in one run.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub risk: &'a RiskConfig,
    pub regime: &'a RegimeInputs,
    pub thresholds: RegimeThresholds,
    pub staleness: Option<Staleness>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(risk: &'a RiskConfig, regime: &'a RegimeInputs) -> Self {
        Self {
            risk,
            regime,
            thresholds: RegimeThresholds::adjust(risk, regime),
            staleness: None,
        }
    }

    pub fn with_staleness(mut self, staleness: Staleness) -> Self {
        self.staleness = Some(staleness);
        self
    }
}

/// Individual entry checks, kept apart so callers can show which failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryConditions {
    pub breakout: bool,
    pub above_sma200: bool,
    pub calm_market: bool,
    pub trending: bool,
    pub volume_surge: bool,
    pub volume_above_average: bool,
    pub volatility_expanding: bool,
    pub not_overbought: bool,
    pub volatility_capped: bool,
}

impl EntryConditions {
    pub fn check(snap: &IndicatorSnapshot, ctx: &EvaluationContext<'_>) -> Self {
        Self {
            breakout: snap.close > snap.high_20_prior,
            above_sma200: snap.is_above_sma200(),
            calm_market: ctx.thresholds.allows_entries(),
            trending: snap.adx > ctx.thresholds.adx_threshold,
            volume_surge: snap.volume_ratio > ctx.risk.volume_ratio_threshold,
            volume_above_average: snap.volume > snap.avg_volume_20,
            volatility_expanding: snap.atr > snap.atr_avg_20,
            not_overbought: snap.rsi < RSI_OVERBOUGHT,
            volatility_capped: snap.atr_ratio <= ctx.thresholds.atr_upper_limit_pct,
        }
    }

    pub fn all(&self) -> bool {
        self.failed().is_empty()
    }

    pub fn failed(&self) -> Vec<&'static str> {
        [
            (self.breakout, "breakout"),
            (self.above_sma200, "above_sma200"),
            (self.calm_market, "calm_market"),
            (self.trending, "trending"),
            (self.volume_surge, "volume_surge"),
            (self.volume_above_average, "volume_above_average"),
            (self.volatility_expanding, "volatility_expanding"),
            (self.not_overbought, "not_overbought"),
            (self.volatility_capped, "volatility_capped"),
        ]
        .into_iter()
        .filter(|(ok, _)| !ok)
        .map(|(_, name)| name)
        .collect()
    }
}

/// Trend-failure exit check used while flat.
fn trend_broken(snap: &IndicatorSnapshot, ctx: &EvaluationContext<'_>) -> bool {
    !snap.is_above_sma200() || snap.adx < ctx.thresholds.adx_threshold || snap.close < snap.low_10
}

/// The state machine itself: one transition per evaluation.
pub fn decide(
    snap: &IndicatorSnapshot,
    state: PositionState,
    ctx: &EvaluationContext<'_>,
) -> Signal {
    match state {
        PositionState::Flat => {
            if EntryConditions::check(snap, ctx).all() {
                Signal::Buy
            } else if trend_broken(snap, ctx) {
                Signal::WatchSell
            } else {
                Signal::Hold
            }
        }
        PositionState::Holding { units, entry_price } => {
            let levels = sizing::holding_levels(entry_price, snap.atr);
            if snap.close < levels.stop_price || snap.close < snap.low_10 {
                Signal::Sell
            } else if snap.close > levels.pyramid_price && units < ctx.risk.max_pyramid_units {
                Signal::PyramidBuy
            } else {
                Signal::Hold
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub ticker: String,
    pub date: NaiveDate,
    pub signal: Signal,
    pub state: PositionState,
    /// Units after acting on the signal.
    pub next_units: u32,
    pub snapshot: IndicatorSnapshot,
    pub entry: EntrySizing,
    pub holding: Option<HoldingLevels>,
}

fn next_units(state: PositionState, signal: Signal) -> u32 {
    match (state, signal) {
        (PositionState::Flat, Signal::Buy) => 1,
        (PositionState::Holding { units, .. }, Signal::PyramidBuy) => units + 1,
        (PositionState::Holding { .. }, Signal::Sell) => 0,
        (state, _) => state.units(),
    }
}

fn check_staleness(series: &PriceSeries, staleness: Option<Staleness>) -> Result<(), TickerError> {
    let (Some(guard), Some(last)) = (staleness, series.last()) else {
        return Ok(());
    };
    if (guard.as_of - last.date).num_days() > guard.max_days {
        return Err(TickerError::StaleData {
            last: last.date,
            as_of: guard.as_of,
        });
    }
    Ok(())
}

/// Evaluates one ticker. Failures are returned, never panicked.
pub fn evaluate_ticker(
    series: &PriceSeries,
    position: Option<&Position>,
    ctx: &EvaluationContext<'_>,
) -> Result<Decision, TickerError> {
    let snapshot = IndicatorSnapshot::compute(series)?;
    check_staleness(series, ctx.staleness)?;

    let state = PositionState::from_position(position);
    let signal = decide(&snapshot, state, ctx);
    let entry = sizing::size(
        ctx.risk,
        snapshot.close,
        snapshot.atr,
        ctx.regime.exchange_rate_krw_usd,
    );
    let holding = match state {
        PositionState::Holding { entry_price, .. } => {
            Some(sizing::holding_levels(entry_price, snapshot.atr))
        }
        PositionState::Flat => None,
    };

    Ok(Decision {
        ticker: series.ticker.clone(),
        date: snapshot.date,
        signal,
        state,
        next_units: next_units(state, signal),
        snapshot,
        entry,
        holding,
    })
}
