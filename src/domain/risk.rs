//! Risk parameters, market regime inputs and the per-run regime adjustment.

/// Account risk parameters. Built once per run by config validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    /// Account size in the seed currency (KRW).
    pub total_seed: f64,
    pub max_loss_rate: f64,
    pub volume_ratio_threshold: f64,
    pub adx_threshold: f64,
    pub atr_upper_limit_pct: f64,
    pub sector_limit: usize,
    pub max_pyramid_units: u32,
    pub forward_pe_default: f64,
}

/// Market-wide inputs refreshed once per run and shared by every ticker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeInputs {
    pub vix_value: f64,
    /// KRW per USD.
    pub exchange_rate_krw_usd: f64,
    pub forward_pe: f64,
}

pub const VIX_CALM: f64 = 20.0;
pub const VIX_FEAR: f64 = 30.0;
/// Points taken off the ADX bar when VIX is below [`VIX_CALM`].
pub const LOW_VIX_ADX_RELIEF: f64 = 2.0;
/// Multiplier on the ATR ceiling when VIX is at or above [`VIX_FEAR`].
pub const HIGH_VIX_ATR_WIDENING: f64 = 1.5;

/// Entry thresholds after the regime adjustment. Computed once per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeThresholds {
    pub adx_threshold: f64,
    pub atr_upper_limit_pct: f64,
    pub vix_value: f64,
}

impl RegimeThresholds {
    pub fn adjust(risk: &RiskConfig, regime: &RegimeInputs) -> Self {
        let adx_threshold = if regime.vix_value < VIX_CALM {
            (risk.adx_threshold - LOW_VIX_ADX_RELIEF).max(0.0)
        } else {
            risk.adx_threshold
        };
        let atr_upper_limit_pct = if regime.vix_value >= VIX_FEAR {
            risk.atr_upper_limit_pct * HIGH_VIX_ATR_WIDENING
        } else {
            risk.atr_upper_limit_pct
        };
        Self {
            adx_threshold,
            atr_upper_limit_pct,
            vix_value: regime.vix_value,
        }
    }

    /// New entries are only taken below the fear level.
    pub fn allows_entries(&self) -> bool {
        self.vix_value < VIX_FEAR
    }
}
