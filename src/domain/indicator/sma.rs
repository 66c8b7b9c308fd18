//! Simple Moving Average over a bar field.
//!
//! SMA(n)[i] = sum(F[i-j] for j in 0..n) / n, computed with a rolling sum.
//! Warmup: first (n-1) bars are invalid. So is any point whose window holds
//! a non-finite value.

use crate::domain::indicator::{Field, IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::DailyBar;

fn field_value(bar: &DailyBar, field: Field) -> f64 {
    match field {
        Field::Close => bar.close,
        Field::Volume => bar.volume as f64,
    }
}

pub fn calculate_sma(bars: &[DailyBar], field: Field, period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Sma { field, period };
    let mut values = Vec::with_capacity(bars.len());

    if period == 0 {
        values.extend(bars.iter().map(|bar| IndicatorPoint {
            date: bar.date,
            valid: false,
            value: 0.0,
        }));
        return IndicatorSeries {
            indicator_type,
            values,
        };
    }

    // missing values in the window: the rolling sum only carries finite ones
    let mut missing = 0usize;
    let mut sum = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        let incoming = field_value(bar, field);
        if incoming.is_finite() {
            sum += incoming;
        } else {
            missing += 1;
        }
        if i >= period {
            let outgoing = field_value(&bars[i - period], field);
            if outgoing.is_finite() {
                sum -= outgoing;
            } else {
                missing -= 1;
            }
        }

        let valid = i + 1 >= period && missing == 0;
        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: if valid { sum / period as f64 } else { 0.0 },
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<DailyBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| DailyBar {
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: (close * 10.0) as u64,
            })
            .collect()
    }

    #[test]
    fn sma_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_sma(&bars, Field::Close, 3);

        assert_eq!(series.len(), 5);
        assert_eq!(series.get(0), None);
        assert_eq!(series.get(1), None);
        assert!(series.get(2).is_some());
    }

    #[test]
    fn sma_rolling_values() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_sma(&bars, Field::Close, 3);

        assert!((series.get(2).unwrap() - 20.0).abs() < 1e-10);
        assert!((series.get(3).unwrap() - 30.0).abs() < 1e-10);
        assert!((series.get(4).unwrap() - 40.0).abs() < 1e-10);
    }

    #[test]
    fn sma_over_volume() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_sma(&bars, Field::Volume, 2);

        // volumes 100, 200, 300
        assert_eq!(series.get(0), None);
        assert!((series.get(1).unwrap() - 150.0).abs() < 1e-10);
        assert!((series.get(2).unwrap() - 250.0).abs() < 1e-10);
    }

    #[test]
    fn missing_value_invalidates_covering_windows() {
        let bars = make_bars(&[10.0, 20.0, f64::NAN, 40.0, 50.0, 60.0]);
        let series = calculate_sma(&bars, Field::Close, 2);

        assert_relative_eq!(series.get(1).unwrap(), 15.0);
        assert_eq!(series.get(2), None);
        assert_eq!(series.get(3), None);
        assert_relative_eq!(series.get(4).unwrap(), 45.0);
        assert_relative_eq!(series.get(5).unwrap(), 55.0);
    }

    #[test]
    fn sma_period_one_is_identity() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_sma(&bars, Field::Close, 1);
        for (i, bar) in bars.iter().enumerate() {
            assert!((series.get(i).unwrap() - bar.close).abs() < 1e-12);
        }
    }

    #[test]
    fn sma_series_shorter_than_period() {
        let bars = make_bars(&[10.0, 20.0]);
        let series = calculate_sma(&bars, Field::Close, 5);
        assert_eq!(series.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn sma_zero_period_is_all_invalid() {
        let bars = make_bars(&[10.0, 20.0]);
        let series = calculate_sma(&bars, Field::Close, 0);
        assert_eq!(series.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn sma_matches_naive_mean() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + ((i * 7) % 13) as f64).collect();
        let bars = make_bars_long(&prices);
        let series = calculate_sma(&bars, Field::Close, 20);

        for i in 19..prices.len() {
            let naive: f64 = prices[i + 1 - 20..=i].iter().sum::<f64>() / 20.0;
            assert_relative_eq!(series.get(i).unwrap(), naive, max_relative = 1e-9);
        }
    }

    fn make_bars_long(prices: &[f64]) -> Vec<DailyBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| DailyBar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }
}
