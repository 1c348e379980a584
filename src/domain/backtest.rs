//! Single-unit replay of the trend rule over a price history.
//!
//! This is a simplified approximation of the live rules: one unit, no
//! pyramiding, no volume or volatility filters and no regime adjustment.
//! Reports must present it as such.
//!
//! Entry: close > previous bar's 20-day high, close > SMA200, ADX > threshold,
//! RSI < 70. Exit: close < SMA200, ADX < threshold or close < 10-day low.
//! Equity compounds by the bar's return only when the position was held
//! coming into the bar.

use crate::domain::error::TickerError;
use crate::domain::indicator::IndicatorType;
use crate::domain::indicator_helpers::compute_indicators;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::signal::RSI_OVERBOUGHT;
use crate::domain::snapshot::{
    ADX_PERIOD, BREAKOUT_HIGH_PERIOD, BREAKOUT_LOW_PERIOD, MIN_BARS, RSI_PERIOD, SMA_PERIOD,
};

const BACKTEST_INDICATORS: [IndicatorType; 5] = [
    IndicatorType::Sma(SMA_PERIOD),
    IndicatorType::Rsi(RSI_PERIOD),
    IndicatorType::Adx(ADX_PERIOD),
    IndicatorType::HighestHigh(BREAKOUT_HIGH_PERIOD),
    IndicatorType::LowestLow(BREAKOUT_LOW_PERIOD),
];

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub adx_threshold: f64,
    /// First bar index evaluated.
    pub warmup_bars: usize,
}

impl BacktestConfig {
    pub fn new(adx_threshold: f64) -> Self {
        Self {
            adx_threshold,
            warmup_bars: MIN_BARS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub ticker: String,
    pub total_return_pct: f64,
    /// Deepest peak-to-trough decline, as a non-positive percentage.
    pub max_drawdown_pct: f64,
    pub trades: usize,
    pub bars_in_market: usize,
}

pub fn run_backtest(
    series: &PriceSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, TickerError> {
    if series.len() < config.warmup_bars.max(MIN_BARS) {
        return Err(TickerError::TooFewBars {
            bars: series.len(),
            minimum: config.warmup_bars.max(MIN_BARS),
        });
    }
    series.validate()?;

    let bars = &series.bars;
    let ind = compute_indicators(bars, &BACKTEST_INDICATORS);
    let sma = &ind[&IndicatorType::Sma(SMA_PERIOD)];
    let rsi = &ind[&IndicatorType::Rsi(RSI_PERIOD)];
    let adx = &ind[&IndicatorType::Adx(ADX_PERIOD)];
    let high_20 = &ind[&IndicatorType::HighestHigh(BREAKOUT_HIGH_PERIOD)];
    let low_10 = &ind[&IndicatorType::LowestLow(BREAKOUT_LOW_PERIOD)];

    let mut position = false;
    let mut equity = 1.0_f64;
    let mut peak = equity;
    let mut max_drawdown = 0.0_f64;
    let mut trades = 0usize;
    let mut bars_in_market = 0usize;

    for i in config.warmup_bars.max(1)..bars.len() {
        let close = bars[i].close;
        let prev_close = bars[i - 1].close;
        let sma_i = sma.simple_at(i);
        let adx_i = adx.directional_at(i).map(|(a, _, _)| a);

        let buy = matches!(
            (high_20.simple_at(i - 1), sma_i, adx_i, rsi.simple_at(i)),
            (Some(h), Some(s), Some(a), Some(r))
                if close > h && close > s && a > config.adx_threshold && r < RSI_OVERBOUGHT
        );
        // an undefined comparison is false, as with missing indicator values
        let sell = sma_i.is_some_and(|s| close < s)
            || adx_i.is_some_and(|a| a < config.adx_threshold)
            || low_10.simple_at(i).is_some_and(|l| close < l);

        let was_in_market = position;
        if buy && !position {
            position = true;
            trades += 1;
        } else if sell && position {
            position = false;
        }

        if was_in_market {
            bars_in_market += 1;
            if prev_close > 0.0 {
                equity *= close / prev_close;
            }
        }

        peak = peak.max(equity);
        if peak > 0.0 {
            max_drawdown = max_drawdown.min((equity - peak) / peak * 100.0);
        }
    }

    if !equity.is_finite() {
        return Err(TickerError::Compute(format!(
            "backtest equity evaluated to {equity}"
        )));
    }

    Ok(BacktestResult {
        ticker: series.ticker.clone(),
        total_return_pct: (equity - 1.0) * 100.0,
        max_drawdown_pct: max_drawdown,
        trades,
        bars_in_market,
    })
}
