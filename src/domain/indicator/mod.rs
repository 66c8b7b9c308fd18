//! Rolling indicator types.
//!
//! - `IndicatorPoint`: a single point in an indicator time series
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSeries`: a time series of indicator values aligned with the bars
//!
//! A point inside the warmup window is kept (so indices stay aligned with the
//! bar series) but marked invalid; [`IndicatorSeries::get`] reports it as
//! absent.

pub mod sma;

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: f64,
}

/// Bar field an indicator is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Close,
    Volume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma { field: Field, period: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Value at `index`, or `None` inside the warmup window / past the end.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values
            .get(index)
            .filter(|p| p.valid)
            .map(|p| p.value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build a series from explicit optional values (absent → invalid point).
    pub fn from_options(
        indicator_type: IndicatorType,
        dates: &[NaiveDate],
        values: &[Option<f64>],
    ) -> Self {
        let values = dates
            .iter()
            .zip(values)
            .map(|(&date, v)| IndicatorPoint {
                date,
                valid: v.is_some(),
                value: v.unwrap_or(0.0),
            })
            .collect();
        Self {
            indicator_type,
            values,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Close => write!(f, "CLOSE"),
            Field::Volume => write!(f, "VOLUME"),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma {
                field: Field::Close,
                period,
            } => write!(f, "SMA({})", period),
            IndicatorType::Sma { field, period } => write!(f, "SMA({},{})", field, period),
        }
    }
}
