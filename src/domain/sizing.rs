//! Unit sizing and stop/target levels.
//!
//! One unit risks `max_loss_rate` of the seed over a `2 * ATR` adverse move.
//! For an open holding every level stays anchored to the original entry
//! price; pyramid adds do not move it.

use crate::domain::risk::RiskConfig;

pub const STOP_ATR_MULTIPLE: f64 = 2.0;
pub const TARGET_ATR_MULTIPLE: f64 = 2.0;
pub const PYRAMID_ATR_MULTIPLE: f64 = 0.5;

/// Size and levels for a fresh entry at the current close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntrySizing {
    pub quantity: u64,
    pub stop_price: f64,
    pub target_price: f64,
}

/// Levels for an open holding, measured from its entry price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldingLevels {
    pub stop_price: f64,
    pub pyramid_price: f64,
}

/// Maximum loss per unit in the quote (trading) currency.
pub fn max_loss_quote(risk: &RiskConfig, exchange_rate: f64) -> f64 {
    if exchange_rate > 0.0 {
        risk.total_seed * risk.max_loss_rate / exchange_rate
    } else {
        0.0
    }
}

pub fn unit_quantity(risk: &RiskConfig, atr: f64, exchange_rate: f64) -> u64 {
    let loss_per_share = STOP_ATR_MULTIPLE * atr;
    if loss_per_share <= 0.0 || !loss_per_share.is_finite() {
        return 0;
    }
    let quantity = (max_loss_quote(risk, exchange_rate) / loss_per_share).floor();
    if quantity.is_finite() && quantity > 0.0 {
        quantity as u64
    } else {
        0
    }
}

pub fn size(risk: &RiskConfig, close: f64, atr: f64, exchange_rate: f64) -> EntrySizing {
    EntrySizing {
        quantity: unit_quantity(risk, atr, exchange_rate),
        stop_price: close - STOP_ATR_MULTIPLE * atr,
        target_price: close + TARGET_ATR_MULTIPLE * atr,
    }
}

pub fn holding_levels(buy_price: f64, atr: f64) -> HoldingLevels {
    HoldingLevels {
        stop_price: buy_price - STOP_ATR_MULTIPLE * atr,
        pyramid_price: buy_price + PYRAMID_ATR_MULTIPLE * atr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::risk::tests::sample_risk;
    use approx::assert_relative_eq;

    #[test]
    fn quantity_from_seed_and_atr() {
        let risk = sample_risk();
        assert_relative_eq!(max_loss_quote(&risk, 1350.0), 740.7407407, epsilon = 1e-6);
        assert_eq!(unit_quantity(&risk, 2.0, 1350.0), 185);
    }

    #[test]
    fn zero_atr_gives_zero_quantity() {
        assert_eq!(unit_quantity(&sample_risk(), 0.0, 1350.0), 0);
        assert_eq!(unit_quantity(&sample_risk(), -1.0, 1350.0), 0);
    }

    #[test]
    fn zero_exchange_rate_gives_zero_quantity() {
        assert_eq!(unit_quantity(&sample_risk(), 2.0, 0.0), 0);
    }

    #[test]
    fn entry_stop_and_target() {
        let s = size(&sample_risk(), 100.0, 2.0, 1350.0);
        assert_relative_eq!(s.stop_price, 96.0);
        assert_relative_eq!(s.target_price, 104.0);
        assert_eq!(s.quantity, 185);
    }

    #[test]
    fn holding_levels_anchor_on_entry() {
        let l = holding_levels(100.0, 2.0);
        assert_relative_eq!(l.pyramid_price, 101.0);
        assert_relative_eq!(l.stop_price, 96.0);

        let l = holding_levels(100.0, 3.0);
        assert_relative_eq!(l.stop_price, 94.0);
    }
}
