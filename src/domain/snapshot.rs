//! Point-in-time indicator snapshot for the latest bar of a series.
//!
//! Every field is computed from bars up to and including the latest one,
//! except `high_20_prior`, which deliberately excludes the latest bar: an
//! entry must clear a high made before today, while `low_10` includes today
//! so today's own low can trigger an exit.

use chrono::NaiveDate;

use crate::domain::error::TickerError;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::indicator_helpers::compute_indicators;
use crate::domain::ohlcv::PriceSeries;

pub const MIN_BARS: usize = 200;
pub const ATR_PERIOD: usize = 20;
pub const ADX_PERIOD: usize = 14;
pub const SMA_PERIOD: usize = 200;
pub const RSI_PERIOD: usize = 14;
pub const VOLUME_AVG_PERIOD: usize = 20;
pub const ATR_AVG_PERIOD: usize = 20;
pub const BREAKOUT_HIGH_PERIOD: usize = 20;
pub const BREAKOUT_LOW_PERIOD: usize = 10;

/// Indicators the snapshot is built from.
pub const SNAPSHOT_INDICATORS: [IndicatorType; 8] = [
    IndicatorType::Atr(ATR_PERIOD),
    IndicatorType::Adx(ADX_PERIOD),
    IndicatorType::Sma(SMA_PERIOD),
    IndicatorType::Rsi(RSI_PERIOD),
    IndicatorType::VolumeSma(VOLUME_AVG_PERIOD),
    IndicatorType::AtrSma {
        atr_period: ATR_PERIOD,
        period: ATR_AVG_PERIOD,
    },
    IndicatorType::HighestHigh(BREAKOUT_HIGH_PERIOD),
    IndicatorType::LowestLow(BREAKOUT_LOW_PERIOD),
];

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
    pub atr: f64,
    pub atr_avg_20: f64,
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
    pub sma200: f64,
    pub rsi: f64,
    pub avg_volume_20: f64,
    /// Highest high of the 20 bars before the latest one.
    pub high_20_prior: f64,
    /// Lowest low of the latest 10 bars, inclusive.
    pub low_10: f64,
    pub atr_ratio: f64,
    pub disparity: f64,
    pub volume_ratio: f64,
}

impl IndicatorSnapshot {
    /// Builds the snapshot for the last bar, or reports why it cannot.
    pub fn compute(series: &PriceSeries) -> Result<Self, TickerError> {
        if series.len() < MIN_BARS {
            return Err(TickerError::TooFewBars {
                bars: series.len(),
                minimum: MIN_BARS,
            });
        }
        series.validate()?;

        let bars = &series.bars;
        let last = bars.len() - 1;
        let date = bars[last].date;
        let indicators = compute_indicators(bars, &SNAPSHOT_INDICATORS);

        let simple = |t: IndicatorType, index: usize| -> Result<f64, TickerError> {
            indicators
                .get(&t)
                .and_then(|s: &IndicatorSeries| s.simple_at(index))
                .ok_or(TickerError::UndefinedIndicator { indicator: t, date })
        };

        let adx_type = IndicatorType::Adx(ADX_PERIOD);
        let (adx, plus_di, minus_di) = indicators
            .get(&adx_type)
            .and_then(|s| s.directional_at(last))
            .ok_or(TickerError::UndefinedIndicator {
                indicator: adx_type,
                date,
            })?;

        let close = bars[last].close;
        let volume = bars[last].volume;
        let atr = simple(IndicatorType::Atr(ATR_PERIOD), last)?;
        let sma200 = simple(IndicatorType::Sma(SMA_PERIOD), last)?;
        let avg_volume_20 = simple(IndicatorType::VolumeSma(VOLUME_AVG_PERIOD), last)?;

        let snapshot = IndicatorSnapshot {
            date,
            close,
            volume,
            atr,
            atr_avg_20: simple(
                IndicatorType::AtrSma {
                    atr_period: ATR_PERIOD,
                    period: ATR_AVG_PERIOD,
                },
                last,
            )?,
            adx,
            plus_di,
            minus_di,
            sma200,
            rsi: simple(IndicatorType::Rsi(RSI_PERIOD), last)?,
            avg_volume_20,
            high_20_prior: simple(IndicatorType::HighestHigh(BREAKOUT_HIGH_PERIOD), last - 1)?,
            low_10: simple(IndicatorType::LowestLow(BREAKOUT_LOW_PERIOD), last)?,
            atr_ratio: if close > 0.0 { atr / close * 100.0 } else { 0.0 },
            disparity: if sma200 > 0.0 {
                (close - sma200) / sma200 * 100.0
            } else {
                0.0
            },
            volume_ratio: if avg_volume_20 > 0.0 {
                volume / avg_volume_20
            } else {
                0.0
            },
        };
        snapshot.ensure_finite()?;
        Ok(snapshot)
    }

    fn ensure_finite(&self) -> Result<(), TickerError> {
        let fields = [
            ("atr", self.atr),
            ("atr_avg_20", self.atr_avg_20),
            ("adx", self.adx),
            ("plus_di", self.plus_di),
            ("minus_di", self.minus_di),
            ("sma200", self.sma200),
            ("rsi", self.rsi),
            ("avg_volume_20", self.avg_volume_20),
            ("atr_ratio", self.atr_ratio),
            ("disparity", self.disparity),
            ("volume_ratio", self.volume_ratio),
        ];
        match fields.iter().find(|(_, v)| !v.is_finite()) {
            Some((name, v)) => Err(TickerError::Compute(format!("{name} evaluated to {v}"))),
            None => Ok(()),
        }
    }

    pub fn is_above_sma200(&self) -> bool {
        self.close > self.sma200
    }

    /// Close converted to the seed currency, rounded to a whole unit.
    pub fn close_krw(&self, exchange_rate: f64) -> f64 {
        (self.close * exchange_rate).round()
    }

    /// Traded value of the latest bar in units of 100 million KRW.
    pub fn volume_krw_billion(&self, exchange_rate: f64) -> f64 {
        self.volume * self.close * exchange_rate / 1e8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::PriceBar;
    use approx::assert_relative_eq;

    fn rising_series(count: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let bars = (0..count)
            .map(|i| {
                let close = 100.0 + i as f64 * 0.5;
                PriceBar {
                    date: start + chrono::Duration::days(i as i64),
                    open: close - 0.2,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000_000.0,
                }
            })
            .collect();
        PriceSeries::new("TEST", bars)
    }

    #[test]
    fn too_few_bars_is_insufficient() {
        let err = IndicatorSnapshot::compute(&rising_series(199)).unwrap_err();
        assert_eq!(
            err,
            TickerError::TooFewBars {
                bars: 199,
                minimum: 200
            }
        );
    }

    #[test]
    fn snapshot_at_minimum_length() {
        let series = rising_series(200);
        let snap = IndicatorSnapshot::compute(&series).unwrap();
        assert_eq!(snap.date, series.last().unwrap().date);
        assert_relative_eq!(snap.close, 100.0 + 199.0 * 0.5);
        // mean of closes 100.0..=199.5
        assert_relative_eq!(snap.sma200, 100.0 + 199.0 * 0.25, epsilon = 1e-9);
        assert!(snap.is_above_sma200());
    }

    #[test]
    fn breakout_high_excludes_latest_bar() {
        let series = rising_series(220);
        let snap = IndicatorSnapshot::compute(&series).unwrap();
        let prev_close = series.bars[218].close;
        assert_relative_eq!(snap.high_20_prior, prev_close + 1.0);
        assert!(snap.close > snap.high_20_prior - 1.0);
    }

    #[test]
    fn breakout_low_includes_latest_bar() {
        let series = rising_series(220);
        let snap = IndicatorSnapshot::compute(&series).unwrap();
        assert_relative_eq!(snap.low_10, series.bars[210].low);
    }

    #[test]
    fn derived_ratios() {
        let snap = IndicatorSnapshot::compute(&rising_series(250)).unwrap();
        assert_relative_eq!(snap.atr_ratio, snap.atr / snap.close * 100.0);
        assert_relative_eq!(
            snap.disparity,
            (snap.close - snap.sma200) / snap.sma200 * 100.0
        );
        assert_relative_eq!(snap.volume_ratio, 1.0);
    }

    #[test]
    fn zero_volume_average_gives_zero_ratio() {
        let mut series = rising_series(220);
        for bar in &mut series.bars {
            bar.volume = 0.0;
        }
        let snap = IndicatorSnapshot::compute(&series).unwrap();
        assert_eq!(snap.volume_ratio, 0.0);
    }

    #[test]
    fn invalid_bar_is_insufficient_data() {
        let mut series = rising_series(220);
        series.bars[100].close = f64::NAN;
        let err = IndicatorSnapshot::compute(&series).unwrap_err();
        assert_eq!(err.kind(), crate::domain::error::FailureKind::InsufficientData);
    }

    #[test]
    fn adjusted_rounding_in_history_is_accepted() {
        let mut series = rising_series(220);
        series.bars[100].close = series.bars[100].high + 1e-9;
        assert!(IndicatorSnapshot::compute(&series).is_ok());
    }

    #[test]
    fn krw_conversions() {
        let snap = IndicatorSnapshot::compute(&rising_series(220)).unwrap();
        assert_relative_eq!(snap.close_krw(1350.0), (snap.close * 1350.0).round());
        assert_relative_eq!(
            snap.volume_krw_billion(1350.0),
            snap.volume * snap.close * 1350.0 / 1e8
        );
    }
}
