//! Shared helper functions for indicator calculations.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::domain::indicator::adx::calculate_adx;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::{calculate_sma, calculate_volume_sma};
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

/// Wilder-smoothed average true range. The seed is the simple mean of the
/// first `period` true ranges; the first bar's range is `high - low`.
pub fn calc_atr(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    if bars.len() < period || period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Atr(period),
            values: bars
                .iter()
                .map(|b| IndicatorSeries::invalid_point(b.date))
                .collect(),
        };
    }

    let tr_values: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect();

    let mut results: Vec<IndicatorPoint> = Vec::with_capacity(bars.len());
    let mut prev_atr = 0.0;

    for i in 0..bars.len() {
        if i < period - 1 {
            results.push(IndicatorSeries::invalid_point(bars[i].date));
            continue;
        }
        let atr = if i == period - 1 {
            tr_values[0..=i].iter().sum::<f64>() / period as f64
        } else {
            (prev_atr * (period - 1) as f64 + tr_values[i]) / period as f64
        };
        prev_atr = atr;
        results.push(IndicatorPoint {
            date: bars[i].date,
            valid: true,
            value: IndicatorValue::Simple(atr),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values: results,
    }
}

/// Applies `reduce` over each trailing window of `period` values ending at
/// the current point. A window containing an undefined value is undefined.
pub fn rolling_apply<F>(
    dates: &[NaiveDate],
    values: &[Option<f64>],
    period: usize,
    indicator_type: IndicatorType,
    reduce: F,
) -> IndicatorSeries
where
    F: Fn(&[f64]) -> f64,
{
    let mut points = Vec::with_capacity(dates.len());
    let mut window: Vec<f64> = Vec::with_capacity(period);

    for (i, &date) in dates.iter().enumerate() {
        if period == 0 || i + 1 < period {
            points.push(IndicatorSeries::invalid_point(date));
            continue;
        }
        window.clear();
        window.extend(values[i + 1 - period..=i].iter().flatten());
        if window.len() == period {
            points.push(IndicatorPoint {
                date,
                valid: true,
                value: IndicatorValue::Simple(reduce(&window)),
            });
        } else {
            points.push(IndicatorSeries::invalid_point(date));
        }
    }

    IndicatorSeries {
        indicator_type,
        values: points,
    }
}

pub fn mean(window: &[f64]) -> f64 {
    window.iter().sum::<f64>() / window.len() as f64
}

pub fn max(window: &[f64]) -> f64 {
    window.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

pub fn min(window: &[f64]) -> f64 {
    window.iter().copied().fold(f64::INFINITY, f64::min)
}

fn bar_dates(bars: &[PriceBar]) -> Vec<NaiveDate> {
    bars.iter().map(|b| b.date).collect()
}

pub fn calc_highest_high(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let highs: Vec<Option<f64>> = bars.iter().map(|b| Some(b.high)).collect();
    rolling_apply(
        &bar_dates(bars),
        &highs,
        period,
        IndicatorType::HighestHigh(period),
        max,
    )
}

pub fn calc_lowest_low(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let lows: Vec<Option<f64>> = bars.iter().map(|b| Some(b.low)).collect();
    rolling_apply(
        &bar_dates(bars),
        &lows,
        period,
        IndicatorType::LowestLow(period),
        min,
    )
}

/// Rolling simple average of the ATR series itself.
pub fn calc_atr_sma(bars: &[PriceBar], atr_period: usize, period: usize) -> IndicatorSeries {
    let atr = calc_atr(bars, atr_period);
    let values: Vec<Option<f64>> = (0..bars.len()).map(|i| atr.simple_at(i)).collect();
    rolling_apply(
        &bar_dates(bars),
        &values,
        period,
        IndicatorType::AtrSma { atr_period, period },
        mean,
    )
}

pub fn compute_indicator(bars: &[PriceBar], indicator_type: IndicatorType) -> IndicatorSeries {
    match indicator_type {
        IndicatorType::Sma(period) => calculate_sma(bars, period),
        IndicatorType::Rsi(period) => calculate_rsi(bars, period),
        IndicatorType::Atr(period) => calc_atr(bars, period),
        IndicatorType::Adx(period) => calculate_adx(bars, period),
        IndicatorType::VolumeSma(period) => calculate_volume_sma(bars, period),
        IndicatorType::AtrSma { atr_period, period } => calc_atr_sma(bars, atr_period, period),
        IndicatorType::HighestHigh(period) => calc_highest_high(bars, period),
        IndicatorType::LowestLow(period) => calc_lowest_low(bars, period),
    }
}

pub fn compute_indicators(
    bars: &[PriceBar],
    indicator_types: &[IndicatorType],
) -> HashMap<IndicatorType, IndicatorSeries> {
    indicator_types
        .iter()
        .map(|&t| (t, compute_indicator(bars, t)))
        .collect()
}
