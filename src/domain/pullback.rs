//! Pullback and reversal-signal locators.
//!
//! Both searches are first-match-wins over a clamped window. The pullback
//! looks for the first bar after the crossover whose low or close touches
//! the short moving average; the signal looks for the first bullish bar
//! breaking the previous high shortly after the pullback.

use crate::domain::crossover::CrossoverEvent;
use crate::domain::indicator_set::IndicatorSet;
use crate::domain::ohlcv::DailyBar;
use crate::domain::scan_params::ScanParams;
use chrono::NaiveDate;
use serde::Serialize;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PullbackEvent {
    pub index: usize,
    pub date: NaiveDate,
    pub low_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Signal on the last bar of the series.
    Today,
    /// Signal on an earlier bar.
    Historic,
}

impl SignalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Today => "today",
            SignalKind::Historic => "historic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignalEvent {
    pub index: usize,
    pub date: NaiveDate,
    pub kind: SignalKind,
}

/// `from + lo ..= min(from + hi, n - 1)`, or `None` when nothing is left.
fn clamped_window(from: usize, lo: usize, hi: usize, n: usize) -> Option<RangeInclusive<usize>> {
    let start = from.checked_add(lo)?;
    if n == 0 || start >= n {
        return None;
    }
    let end = from.saturating_add(hi).min(n - 1);
    (start <= end).then_some(start..=end)
}

pub fn locate_pullback(
    bars: &[DailyBar],
    indicators: &IndicatorSet,
    crossover: &CrossoverEvent,
    params: &ScanParams,
) -> Option<PullbackEvent> {
    let window = clamped_window(
        crossover.index,
        params.pullback_min,
        params.pullback_max,
        bars.len(),
    )?;

    window.into_iter().find_map(|i| {
        let ma = indicators.price_ma_short.get(i)?;
        let bar = &bars[i];
        if !bar.low.is_finite() || !bar.close.is_finite() {
            return None;
        }
        let touches = params.touch_band.contains(bar.low, ma, params.touch_margin)
            || params.touch_band.contains(bar.close, ma, params.touch_margin);
        touches.then_some(PullbackEvent {
            index: i,
            date: bar.date,
            low_price: bar.low,
        })
    })
}

pub fn locate_signal(
    bars: &[DailyBar],
    pullback: &PullbackEvent,
    signal_lookback: usize,
) -> Option<SignalEvent> {
    let n = bars.len();
    let window = clamped_window(pullback.index, 1, signal_lookback, n)?;

    window.into_iter().find_map(|i| {
        let bar = &bars[i];
        let prev = &bars[i - 1];
        let qualifies = bar.is_finite()
            && prev.high.is_finite()
            && bar.is_bullish()
            && bar.breaks_high_of(prev);
        qualifies.then(|| SignalEvent {
            index: i,
            date: bar.date,
            kind: if i == n - 1 {
                SignalKind::Today
            } else {
                SignalKind::Historic
            },
        })
    })
}
