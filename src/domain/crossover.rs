//! Golden-cross locator.
//!
//! Scans the most recent `lookback` bars for the short price average moving
//! from at-or-below the long average to above it, optionally gated on the
//! short volume average running above the long volume average. When several
//! bars qualify, the most recent one is kept.

use crate::domain::indicator_set::IndicatorSet;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CrossoverEvent {
    pub index: usize,
    pub date: NaiveDate,
}

pub fn locate_crossover(
    indicators: &IndicatorSet,
    long_window: usize,
    lookback: usize,
    volume_gate: bool,
) -> Option<CrossoverEvent> {
    let n = indicators.len();
    if n < long_window.max(lookback + 1) {
        return None;
    }

    let start = long_window.max(n - lookback - 1).max(1);
    let mut found = None;

    for i in start..n {
        let (Some(prev_short), Some(prev_long), Some(cur_short), Some(cur_long)) = (
            indicators.price_ma_short.get(i - 1),
            indicators.price_ma_long.get(i - 1),
            indicators.price_ma_short.get(i),
            indicators.price_ma_long.get(i),
        ) else {
            continue;
        };
        let (Some(vol_short), Some(vol_long)) = (
            indicators.vol_ma_short.get(i),
            indicators.vol_ma_long.get(i),
        ) else {
            continue;
        };

        let price_cross = prev_short <= prev_long && cur_short > cur_long;
        let volume_ok = !volume_gate || vol_short > vol_long;

        if price_cross && volume_ok {
            if let Some(date) = indicators.date(i) {
                found = Some(CrossoverEvent { index: i, date });
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::{Field, IndicatorSeries, IndicatorType};

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    fn column(field: Field, period: usize, values: &[Option<f64>]) -> IndicatorSeries {
        IndicatorSeries::from_options(
            IndicatorType::Sma { field, period },
            &dates(values.len()),
            values,
        )
    }

    /// Indicator set with hand-placed averages; long window 4.
    fn make_set(
        price_short: &[Option<f64>],
        price_long: &[Option<f64>],
        vol_short: &[Option<f64>],
        vol_long: &[Option<f64>],
    ) -> IndicatorSet {
        IndicatorSet {
            price_ma_short: column(Field::Close, 2, price_short),
            price_ma_long: column(Field::Close, 4, price_long),
            vol_ma_short: column(Field::Volume, 2, vol_short),
            vol_ma_long: column(Field::Volume, 4, vol_long),
            vol_ma_ultra_short: column(Field::Volume, 1, vol_short),
        }
    }

    fn flat(n: usize, v: f64) -> Vec<Option<f64>> {
        vec![Some(v); n]
    }

    #[test]
    fn single_crossover_found() {
        let mut short = flat(10, 9.0);
        for v in short.iter_mut().skip(6) {
            *v = Some(11.0);
        }
        let set = make_set(&short, &flat(10, 10.0), &flat(10, 2.0), &flat(10, 1.0));

        let cross = locate_crossover(&set, 4, 8, true).unwrap();
        assert_eq!(cross.index, 6);
        assert_eq!(cross.date, dates(10)[6]);
    }

    #[test]
    fn most_recent_crossover_wins() {
        // up at 5, down at 7, up again at 8
        let short: Vec<Option<f64>> = [9.0, 9.0, 9.0, 9.0, 9.0, 11.0, 11.0, 9.0, 11.0, 11.0]
            .iter()
            .map(|&v| Some(v))
            .collect();
        let set = make_set(&short, &flat(10, 10.0), &flat(10, 2.0), &flat(10, 1.0));

        let cross = locate_crossover(&set, 4, 8, true).unwrap();
        assert_eq!(cross.index, 8);
    }

    #[test]
    fn equality_on_prior_bar_counts_as_below() {
        let mut short = flat(8, 10.0);
        short[7] = Some(10.5);
        let set = make_set(&short, &flat(8, 10.0), &flat(8, 2.0), &flat(8, 1.0));

        assert_eq!(locate_crossover(&set, 4, 6, true).map(|c| c.index), Some(7));
    }

    #[test]
    fn volume_gate_blocks_crossover() {
        let mut short = flat(10, 9.0);
        for v in short.iter_mut().skip(6) {
            *v = Some(11.0);
        }
        // short volume average below long volume average
        let set = make_set(&short, &flat(10, 10.0), &flat(10, 1.0), &flat(10, 2.0));

        assert!(locate_crossover(&set, 4, 8, true).is_none());
        assert_eq!(locate_crossover(&set, 4, 8, false).map(|c| c.index), Some(6));
    }

    #[test]
    fn crossover_outside_lookback_ignored() {
        let mut short = flat(40, 9.0);
        for v in short.iter_mut().skip(5) {
            *v = Some(11.0);
        }
        let set = make_set(&short, &flat(40, 10.0), &flat(40, 2.0), &flat(40, 1.0));

        // window starts at max(4, 40 - 10 - 1) = 29
        assert!(locate_crossover(&set, 4, 10, true).is_none());
        assert_eq!(locate_crossover(&set, 4, 36, true).map(|c| c.index), Some(5));
    }

    #[test]
    fn absent_values_are_skipped_not_zero() {
        // prior short average absent: a zero substitute would fake a cross
        let mut short = flat(10, 11.0);
        short[5] = None;
        let set = make_set(&short, &flat(10, 10.0), &flat(10, 2.0), &flat(10, 1.0));

        assert!(locate_crossover(&set, 4, 8, true).is_none());
    }

    #[test]
    fn too_short_series_has_no_crossover() {
        let set = make_set(&flat(3, 9.0), &flat(3, 10.0), &flat(3, 2.0), &flat(3, 1.0));
        assert!(locate_crossover(&set, 4, 1, true).is_none());
    }

    #[test]
    fn history_shorter_than_lookback_has_no_crossover() {
        let mut short = flat(10, 9.0);
        short[9] = Some(11.0);
        let set = make_set(&short, &flat(10, 10.0), &flat(10, 2.0), &flat(10, 1.0));

        assert!(locate_crossover(&set, 4, 30, true).is_none());
        assert_eq!(locate_crossover(&set, 4, 9, true).map(|c| c.index), Some(9));
    }

    #[test]
    fn no_crossover_when_always_above() {
        let set = make_set(&flat(10, 11.0), &flat(10, 10.0), &flat(10, 2.0), &flat(10, 1.0));
        assert!(locate_crossover(&set, 4, 8, true).is_none());
    }
}
