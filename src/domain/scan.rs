//! Per-instrument scan: indicators, crossover, pullback, signal, volume ratio.

use crate::domain::crossover::{locate_crossover, CrossoverEvent};
use crate::domain::indicator_set::IndicatorSet;
use crate::domain::pullback::{locate_pullback, locate_signal, PullbackEvent, SignalEvent};
use crate::domain::scan_params::{PatternTarget, ScanParams};
use crate::domain::series::InstrumentSeries;
use crate::domain::volume_ratio::{round2, volume_ratio};
use chrono::NaiveDate;
use serde::Serialize;

/// Golden cross plus the moving averages on the last bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceCrossSummary {
    pub crossover: CrossoverEvent,
    pub ma_short: f64,
    pub ma_long: f64,
    /// `(ma_short / ma_long - 1) * 100`, two decimals.
    pub gap_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullbackSummary {
    pub crossover: CrossoverEvent,
    pub pullback: PullbackEvent,
    pub signal: SignalEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeRatioSummary {
    pub ratio: f64,
    pub last_volume: u64,
    pub ma_ultra_short: f64,
    pub ma_short: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub code: String,
    pub as_of: NaiveDate,
    pub last_close: f64,
    pub price_cross: Option<PriceCrossSummary>,
    pub pullback: Option<PullbackSummary>,
    pub volume_ratio: Option<VolumeRatioSummary>,
}

impl ScanResult {
    pub fn is_hit_for(&self, target: PatternTarget) -> bool {
        match target {
            PatternTarget::PriceCross => self.price_cross.is_some(),
            PatternTarget::Pullback => self.pullback.is_some(),
            PatternTarget::VolumeRatio => self.volume_ratio.is_some(),
            PatternTarget::All => {
                self.price_cross.is_some() || self.pullback.is_some() || self.volume_ratio.is_some()
            }
        }
    }
}

/// Scan one series. `None` means the instrument shows none of the patterns
/// `target` asks for, including when history is too short.
pub fn scan_instrument(
    series: &InstrumentSeries,
    params: &ScanParams,
    target: PatternTarget,
) -> Option<ScanResult> {
    let last_bar = series.last()?;
    let bars = series.bars();
    let indicators = IndicatorSet::build(series, params);
    let has_history = series.len() >= params.min_history();

    let crossover = if has_history && target.runs_crossover() {
        locate_crossover(
            &indicators,
            params.price_ma_long,
            params.crossover_lookback,
            params.volume_gate,
        )
    } else {
        None
    };

    let price_cross = crossover.and_then(|c| price_cross_summary(&indicators, c));

    let pullback = if target.runs_pullback() {
        crossover.and_then(|c| {
            let pullback = locate_pullback(bars, &indicators, &c, params)?;
            let signal = locate_signal(bars, &pullback, params.signal_lookback)?;
            Some(PullbackSummary {
                crossover: c,
                pullback,
                signal,
            })
        })
    } else {
        None
    };

    let volume_ratio = if target.runs_volume_ratio() {
        volume_ratio_summary(&indicators, last_bar.volume)
    } else {
        None
    };

    let result = ScanResult {
        code: series.code().to_string(),
        as_of: last_bar.date,
        last_close: last_bar.close,
        price_cross,
        pullback,
        volume_ratio,
    };
    result.is_hit_for(target).then_some(result)
}

fn price_cross_summary(
    indicators: &IndicatorSet,
    crossover: CrossoverEvent,
) -> Option<PriceCrossSummary> {
    let last = indicators.len().checked_sub(1)?;
    let ma_short = indicators.price_ma_short.get(last)?;
    let ma_long = indicators.price_ma_long.get(last)?;
    let gap_pct = (ma_long != 0.0).then(|| round2((ma_short / ma_long - 1.0) * 100.0));

    Some(PriceCrossSummary {
        crossover,
        ma_short,
        ma_long,
        gap_pct,
    })
}

fn volume_ratio_summary(
    indicators: &IndicatorSet,
    last_volume: u64,
) -> Option<VolumeRatioSummary> {
    let ratio = volume_ratio(indicators)?;
    let last = indicators.len() - 1;
    Some(VolumeRatioSummary {
        ratio,
        last_volume,
        ma_ultra_short: indicators.vol_ma_ultra_short.get(last)?,
        ma_short: indicators.vol_ma_short.get(last)?,
    })
}
