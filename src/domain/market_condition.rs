//! Market-wide diagnosis shown at the top of the daily report.
//!
//! Purely descriptive: nothing here feeds back into signal evaluation.

use std::fmt;

use crate::domain::ohlcv::PriceSeries;
use crate::domain::snapshot::SMA_PERIOD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VixLevel {
    Stable,
    Caution,
    Fear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisparityLevel {
    Overheated,
    Normal,
    Undervalued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatilityLevel {
    Healthy,
    HighVolatility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuationLevel {
    Overvalued,
    SomewhatHigh,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketPhase {
    Overheated,
    BottomOpportunity,
    HighVolatility,
    Normal,
}

impl MarketPhase {
    /// Suggested risk per unit, as a fraction of the seed.
    pub fn suggested_loss_rate(&self, configured: f64) -> f64 {
        match self {
            MarketPhase::Overheated => configured / 2.0,
            _ => configured,
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            MarketPhase::Overheated => {
                "Low VIX, stretched index and rich valuation: halve the risk per entry and take profits early."
            }
            MarketPhase::BottomOpportunity => {
                "Fear is high or the index trades well below its 200-day average: keep full risk on strong trends."
            }
            MarketPhase::HighVolatility => {
                "Average ATR ratio above 3.5%: honour stops strictly and realise targets quickly."
            }
            MarketPhase::Normal => "All gauges in range: keep the standard risk per entry.",
        }
    }
}

impl fmt::Display for VixLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VixLevel::Stable => "Stable",
            VixLevel::Caution => "Caution",
            VixLevel::Fear => "Fear",
        })
    }
}

impl fmt::Display for DisparityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DisparityLevel::Overheated => "Overheated",
            DisparityLevel::Normal => "Normal",
            DisparityLevel::Undervalued => "Undervalued",
        })
    }
}

impl fmt::Display for VolatilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VolatilityLevel::Healthy => "Healthy",
            VolatilityLevel::HighVolatility => "High volatility",
        })
    }
}

impl fmt::Display for ValuationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValuationLevel::Overvalued => "Overvalued",
            ValuationLevel::SomewhatHigh => "Somewhat high",
            ValuationLevel::Normal => "Normal",
        })
    }
}

impl fmt::Display for MarketPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MarketPhase::Overheated => "Overheated market",
            MarketPhase::BottomOpportunity => "Bottom opportunity",
            MarketPhase::HighVolatility => "High-volatility market",
            MarketPhase::Normal => "Normal market",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketCondition {
    pub vix: f64,
    pub sp500_disparity_pct: f64,
    pub avg_atr_ratio: f64,
    pub forward_pe: f64,
    pub vix_level: VixLevel,
    pub disparity_level: DisparityLevel,
    pub volatility_level: VolatilityLevel,
    pub valuation_level: ValuationLevel,
    pub phase: MarketPhase,
}

impl MarketCondition {
    pub fn assess(vix: f64, sp500_disparity_pct: f64, avg_atr_ratio: f64, forward_pe: f64) -> Self {
        let vix_level = if vix < 20.0 {
            VixLevel::Stable
        } else if vix < 30.0 {
            VixLevel::Caution
        } else {
            VixLevel::Fear
        };
        let disparity_level = if sp500_disparity_pct > 10.0 {
            DisparityLevel::Overheated
        } else if sp500_disparity_pct > -10.0 {
            DisparityLevel::Normal
        } else {
            DisparityLevel::Undervalued
        };
        let volatility_level = if avg_atr_ratio < 3.0 {
            VolatilityLevel::Healthy
        } else {
            VolatilityLevel::HighVolatility
        };
        let valuation_level = if forward_pe > 20.0 {
            ValuationLevel::Overvalued
        } else if forward_pe > 18.0 {
            ValuationLevel::SomewhatHigh
        } else {
            ValuationLevel::Normal
        };

        let phase = if vix < 20.0 && sp500_disparity_pct > 10.0 && forward_pe > 20.0 {
            MarketPhase::Overheated
        } else if vix > 30.0 || sp500_disparity_pct < -10.0 {
            MarketPhase::BottomOpportunity
        } else if avg_atr_ratio > 3.5 {
            MarketPhase::HighVolatility
        } else {
            MarketPhase::Normal
        };

        Self {
            vix,
            sp500_disparity_pct,
            avg_atr_ratio,
            forward_pe,
            vix_level,
            disparity_level,
            volatility_level,
            valuation_level,
            phase,
        }
    }
}

/// Distance of the index close from its 200-day SMA in percent, or 0 when the
/// series is too short to tell.
pub fn index_disparity(series: &PriceSeries) -> f64 {
    let bars = &series.bars;
    if bars.len() < SMA_PERIOD {
        return 0.0;
    }
    let window = &bars[bars.len() - SMA_PERIOD..];
    let sma = window.iter().map(|b| b.close).sum::<f64>() / SMA_PERIOD as f64;
    let close = window[SMA_PERIOD - 1].close;
    if sma > 0.0 && sma.is_finite() && close.is_finite() {
        (close / sma - 1.0) * 100.0
    } else {
        0.0
    }
}
