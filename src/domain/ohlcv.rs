//! Daily price bar representation.

use chrono::NaiveDate;

use crate::domain::error::TickerError;

/// Relative slack for range checks. Split and dividend adjusted closes are
/// often rounded a hair past the adjusted high or low.
pub const PRICE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// Checks the bar is numeric and internally consistent.
    ///
    /// The upstream source does not enforce `low <= close <= high`, so a bar
    /// violating it is rejected here rather than fed to the indicators.
    pub fn validate(&self) -> Result<(), TickerError> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(TickerError::InvalidBar {
                    date: self.date,
                    reason: format!("{name} is not numeric"),
                });
            }
        }
        let slack = PRICE_TOLERANCE * self.high.abs().max(self.low.abs()).max(1.0);
        if self.high < self.low - slack {
            return Err(self.invalid("high below low"));
        }
        if self.close > self.high + slack || self.close < self.low - slack {
            return Err(self.invalid("close outside high/low range"));
        }
        if self.volume < 0.0 {
            return Err(self.invalid("negative volume"));
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> TickerError {
        TickerError::InvalidBar {
            date: self.date,
            reason: reason.to_string(),
        }
    }
}

/// An ordered (ascending by date) daily series for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub ticker: String,
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        Self {
            ticker: ticker.into(),
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn validate(&self) -> Result<(), TickerError> {
        self.bars.iter().try_for_each(PriceBar::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn true_range_hl_dominates() {
        let bar = sample_bar();
        // high-low=20, |high-100|=10, |low-100|=10 → 20
        assert!((bar.true_range(100.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_bar();
        // high-low=20, |110-70|=40, |90-70|=20 → 40
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        let bar = sample_bar();
        assert!((bar.true_range(130.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn valid_bar_passes() {
        assert!(sample_bar().validate().is_ok());
    }

    #[test]
    fn high_below_low_rejected() {
        let bar = PriceBar {
            high: 80.0,
            ..sample_bar()
        };
        assert!(matches!(bar.validate(), Err(TickerError::InvalidBar { .. })));
    }

    #[test]
    fn close_outside_range_rejected() {
        let bar = PriceBar {
            close: 111.0,
            ..sample_bar()
        };
        assert!(bar.validate().is_err());
    }

    #[test]
    fn rounding_past_the_range_is_tolerated() {
        let bar = PriceBar {
            close: 110.0 + 1e-9,
            ..sample_bar()
        };
        assert!(bar.validate().is_ok());
        let bar = PriceBar {
            close: 90.0 - 1e-9,
            ..sample_bar()
        };
        assert!(bar.validate().is_ok());
        let bar = PriceBar {
            close: 110.01,
            ..sample_bar()
        };
        assert!(bar.validate().is_err());
    }

    #[test]
    fn nan_rejected() {
        let bar = PriceBar {
            close: f64::NAN,
            ..sample_bar()
        };
        let err = bar.validate().unwrap_err();
        assert!(err.to_string().contains("close is not numeric"));
    }

    #[test]
    fn negative_volume_rejected() {
        let bar = PriceBar {
            volume: -1.0,
            ..sample_bar()
        };
        assert!(bar.validate().is_err());
    }

    #[test]
    fn series_sorts_bars() {
        let mut later = sample_bar();
        later.date = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        let series = PriceSeries::new("AAPL", vec![later.clone(), sample_bar()]);
        assert_eq!(series.bars[0].date, sample_bar().date);
        assert_eq!(series.last(), Some(&later));
        assert_eq!(series.len(), 2);
    }
}
