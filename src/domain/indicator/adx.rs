//! Wilder's Directional Movement Index: ADX, +DI and -DI.
//!
//! For each bar after the first:
//! - up = H[i] - H[i-1], down = L[i-1] - L[i]
//! - +DM = up if up > down and up > 0, else 0
//! - -DM = down if down > up and down > 0, else 0
//! - TR = true range against the previous close
//!
//! +DM, -DM and TR are Wilder-smoothed (seed = mean of the first n values).
//! +DI = 100 * +DM_s / TR_s, -DI = 100 * -DM_s / TR_s,
//! DX = 100 * |+DI - -DI| / (+DI + -DI), ADX = Wilder average of DX.
//!
//! Warmup: the first 2n-1 bars are invalid (n bars for the DI seed, another
//! n-1 for the ADX seed).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

fn wilder(prev: f64, current: f64, period: usize) -> f64 {
    (prev * (period - 1) as f64 + current) / period as f64
}

pub fn calculate_adx(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let mut values: Vec<IndicatorPoint> = bars
        .iter()
        .map(|b| IndicatorSeries::invalid_point(b.date))
        .collect();

    if period == 0 || bars.len() < 2 * period {
        return IndicatorSeries {
            indicator_type: IndicatorType::Adx(period),
            values,
        };
    }

    // index k here corresponds to bar k + 1
    let mut plus_dm = Vec::with_capacity(bars.len() - 1);
    let mut minus_dm = Vec::with_capacity(bars.len() - 1);
    let mut tr = Vec::with_capacity(bars.len() - 1);
    for w in bars.windows(2) {
        let up = w[1].high - w[0].high;
        let down = w[0].low - w[1].low;
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
        tr.push(w[1].true_range(w[0].close));
    }

    let mut s_plus = plus_dm[..period].iter().sum::<f64>() / period as f64;
    let mut s_minus = minus_dm[..period].iter().sum::<f64>() / period as f64;
    let mut s_tr = tr[..period].iter().sum::<f64>() / period as f64;

    let directional = |s_plus: f64, s_minus: f64, s_tr: f64| -> (f64, f64, f64) {
        let (plus_di, minus_di) = if s_tr > 0.0 {
            (100.0 * s_plus / s_tr, 100.0 * s_minus / s_tr)
        } else {
            (0.0, 0.0)
        };
        let di_sum = plus_di + minus_di;
        let dx = if di_sum > 0.0 {
            100.0 * (plus_di - minus_di).abs() / di_sum
        } else {
            0.0
        };
        (plus_di, minus_di, dx)
    };

    // DI is first defined at bar `period`
    let mut dx_values = Vec::with_capacity(bars.len());
    let mut di_values = Vec::with_capacity(bars.len());
    let (p, m, dx) = directional(s_plus, s_minus, s_tr);
    dx_values.push(dx);
    di_values.push((p, m));

    for k in period..tr.len() {
        s_plus = wilder(s_plus, plus_dm[k], period);
        s_minus = wilder(s_minus, minus_dm[k], period);
        s_tr = wilder(s_tr, tr[k], period);
        let (p, m, dx) = directional(s_plus, s_minus, s_tr);
        dx_values.push(dx);
        di_values.push((p, m));
    }

    // dx_values[j] belongs to bar period + j
    let mut adx = dx_values[..period].iter().sum::<f64>() / period as f64;
    for j in (period - 1)..dx_values.len() {
        if j > period - 1 {
            adx = wilder(adx, dx_values[j], period);
        }
        let bar_idx = period + j;
        let (plus_di, minus_di) = di_values[j];
        values[bar_idx] = IndicatorPoint {
            date: bars[bar_idx].date,
            valid: true,
            value: IndicatorValue::Directional {
                adx,
                plus_di,
                minus_di,
            },
        };
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Adx(period),
        values,
    }
}
