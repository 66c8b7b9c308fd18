//! InstrumentSeries: one instrument's ordered daily bars.

use crate::domain::error::ScreenerError;
use crate::domain::ohlcv::DailyBar;
use chrono::NaiveDate;

/// Ordered, validated daily series for a single instrument.
///
/// Construction rejects unsorted or duplicate dates, so every consumer
/// downstream can index by position. Missing prices stay in the series as
/// NaN; averages whose window covers one are absent and the locators skip
/// such bars.
#[derive(Debug, Clone)]
pub struct InstrumentSeries {
    code: String,
    market: String,
    bars: Vec<DailyBar>,
}

impl InstrumentSeries {
    pub fn new(
        code: String,
        market: String,
        bars: Vec<DailyBar>,
    ) -> Result<Self, ScreenerError> {
        for (i, pair) in bars.windows(2).enumerate() {
            let (prev, cur) = (&pair[0], &pair[1]);
            if cur.date == prev.date {
                return Err(ScreenerError::DataIntegrity {
                    code,
                    reason: format!("duplicate date {} at index {}", cur.date, i + 1),
                });
            }
            if cur.date < prev.date {
                return Err(ScreenerError::DataIntegrity {
                    code,
                    reason: format!(
                        "dates out of order at index {}: {} after {}",
                        i + 1,
                        cur.date,
                        prev.date
                    ),
                });
            }
        }

        Ok(Self { code, market, bars })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn market(&self) -> &str {
        &self.market
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&DailyBar> {
        self.bars.last()
    }

    /// First and last date, if any bars exist.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.bars.first(), self.bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date)),
            _ => None,
        }
    }

    /// Series restricted to bars on or before `as_of`.
    pub fn up_to(&self, as_of: NaiveDate) -> InstrumentSeries {
        let end = self.bars.partition_point(|b| b.date <= as_of);
        InstrumentSeries {
            code: self.code.clone(),
            market: self.market.clone(),
            bars: self.bars[..end].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bar(date: &str, close: f64) -> DailyBar {
        DailyBar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn accepts_ordered_series() {
        let series = InstrumentSeries::new(
            "005930".into(),
            "KOSPI".into(),
            vec![
                make_bar("2026-02-18", 100.0),
                make_bar("2026-02-19", 101.0),
                make_bar("2026-02-20", 102.0),
            ],
        )
        .unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.code(), "005930");
        assert_eq!(series.market(), "KOSPI");
        assert!((series.last().unwrap().close - 102.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_duplicate_dates() {
        let result = InstrumentSeries::new(
            "005930".into(),
            "KOSPI".into(),
            vec![
                make_bar("2026-02-18", 100.0),
                make_bar("2026-02-18", 101.0),
            ],
        );
        assert!(matches!(
            result,
            Err(ScreenerError::DataIntegrity { ref reason, .. }) if reason.contains("duplicate")
        ));
    }

    #[test]
    fn rejects_unsorted_dates() {
        let result = InstrumentSeries::new(
            "005930".into(),
            "KOSPI".into(),
            vec![
                make_bar("2026-02-19", 100.0),
                make_bar("2026-02-18", 101.0),
            ],
        );
        assert!(matches!(
            result,
            Err(ScreenerError::DataIntegrity { ref reason, .. }) if reason.contains("out of order")
        ));
    }

    #[test]
    fn missing_prices_are_kept() {
        let mut bars = vec![
            make_bar("2026-02-18", 100.0),
            make_bar("2026-02-19", 101.0),
            make_bar("2026-02-20", 102.0),
        ];
        bars[0].open = f64::NAN;
        bars[1].close = f64::NAN;

        let series = InstrumentSeries::new("A".into(), "KOSPI".into(), bars).unwrap();
        assert_eq!(series.len(), 3);
        assert!(series.bars()[1].close.is_nan());
    }

    #[test]
    fn empty_series_is_valid() {
        let series = InstrumentSeries::new("A".into(), "KOSPI".into(), vec![]).unwrap();
        assert!(series.is_empty());
        assert!(series.date_range().is_none());
    }

    #[test]
    fn up_to_truncates_after_as_of() {
        let series = InstrumentSeries::new(
            "A".into(),
            "KOSPI".into(),
            vec![
                make_bar("2026-02-18", 100.0),
                make_bar("2026-02-19", 101.0),
                make_bar("2026-02-20", 102.0),
            ],
        )
        .unwrap();

        let cut = series.up_to(NaiveDate::from_ymd_opt(2026, 2, 19).unwrap());
        assert_eq!(cut.len(), 2);
        assert_eq!(
            cut.date_range(),
            Some((
                NaiveDate::from_ymd_opt(2026, 2, 18).unwrap(),
                NaiveDate::from_ymd_opt(2026, 2, 19).unwrap()
            ))
        );
    }
}
