//! Simple moving averages of close and of volume.
//!
//! SMA(n)[i] = sum(C[i-j] for j in 0..n) / n
//! Warmup: first (n-1) bars are invalid.

use chrono::NaiveDate;

use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::indicator_helpers::{mean, rolling_apply};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_sma(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
    let closes: Vec<Option<f64>> = bars.iter().map(|b| Some(b.close)).collect();
    rolling_apply(&dates, &closes, period, IndicatorType::Sma(period), mean)
}

pub fn calculate_volume_sma(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
    let volumes: Vec<Option<f64>> = bars.iter().map(|b| Some(b.volume)).collect();
    rolling_apply(
        &dates,
        &volumes,
        period,
        IndicatorType::VolumeSma(period),
        mean,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bars(prices: &[f64]) -> Vec<PriceBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: close * 10.0,
            })
            .collect()
    }

    #[test]
    fn sma_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0]);
        let series = calculate_sma(&bars, 3);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[3].valid);
    }

    #[test]
    fn sma_values() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0]);
        let series = calculate_sma(&bars, 3);
        assert!((series.simple_at(2).unwrap() - 20.0).abs() < 1e-9);
        assert!((series.simple_at(3).unwrap() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn volume_sma_uses_volume() {
        let bars = make_bars(&[10.0, 20.0]);
        let series = calculate_volume_sma(&bars, 2);
        assert_eq!(series.indicator_type, IndicatorType::VolumeSma(2));
        assert!((series.simple_at(1).unwrap() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn sma_zero_period_all_invalid() {
        let bars = make_bars(&[10.0, 20.0]);
        let series = calculate_sma(&bars, 0);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }
}
