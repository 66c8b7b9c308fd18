//! Daily OHLCV bar representation.

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl DailyBar {
    /// close > open
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Close or high above the previous bar's high.
    pub fn breaks_high_of(&self, prev: &DailyBar) -> bool {
        self.close > prev.high || self.high > prev.high
    }

    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
    }
}
