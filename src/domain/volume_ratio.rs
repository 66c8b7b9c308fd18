//! Ultra-short over short volume-average ratio on the final bar.

use crate::domain::indicator_set::IndicatorSet;

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `vol_ma_ultra_short / vol_ma_short` at the last index, when the ultra-short
/// average is strictly above a positive short average.
pub fn volume_ratio(indicators: &IndicatorSet) -> Option<f64> {
    let last = indicators.len().checked_sub(1)?;
    let ultra = indicators.vol_ma_ultra_short.get(last)?;
    let short = indicators.vol_ma_short.get(last)?;

    if short <= 0.0 || ultra <= short {
        return None;
    }
    Some(round2(ultra / short))
}
