//! IndicatorSet: the five rolling statistics every scan stage reads.

use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::{Field, IndicatorSeries};
use crate::domain::scan_params::ScanParams;
use crate::domain::series::InstrumentSeries;
use chrono::NaiveDate;

/// Per-index price and volume moving averages, aligned with the bar series.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub price_ma_short: IndicatorSeries,
    pub price_ma_long: IndicatorSeries,
    pub vol_ma_short: IndicatorSeries,
    pub vol_ma_long: IndicatorSeries,
    pub vol_ma_ultra_short: IndicatorSeries,
}

impl IndicatorSet {
    pub fn build(series: &InstrumentSeries, params: &ScanParams) -> Self {
        let bars = series.bars();
        Self {
            price_ma_short: calculate_sma(bars, Field::Close, params.price_ma_short),
            price_ma_long: calculate_sma(bars, Field::Close, params.price_ma_long),
            vol_ma_short: calculate_sma(bars, Field::Volume, params.volume_ma_short),
            vol_ma_long: calculate_sma(bars, Field::Volume, params.price_ma_long),
            vol_ma_ultra_short: calculate_sma(bars, Field::Volume, params.volume_ma_ultra_short),
        }
    }

    pub fn len(&self) -> usize {
        self.price_ma_short.len()
    }

    pub fn is_empty(&self) -> bool {
        self.price_ma_short.is_empty()
    }

    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        self.price_ma_short.values.get(index).map(|p| p.date)
    }
}
