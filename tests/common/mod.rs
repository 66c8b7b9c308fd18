#![allow(dead_code)]

use chrono::NaiveDate;
pub use gcscan::domain::ohlcv::DailyBar;
use gcscan::domain::error::ScreenerError;
use gcscan::domain::scan_params::PatternTarget;
use gcscan::domain::screener::ScreenOptions;
use gcscan::domain::universe::Listing;
use gcscan::ports::data_port::DataPort;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<DailyBar>>,
    pub errors: HashMap<String, String>,
    pub listings: HashMap<String, Vec<Listing>>,
    /// Raise the flag while fetching this code.
    pub cancel_on: Option<(String, Arc<AtomicBool>)>,
    pub fetches: AtomicUsize,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            listings: HashMap::new(),
            cancel_on: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<DailyBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }

    pub fn with_listing(mut self, market: &str, code: &str, name: &str, market_cap: u64) -> Self {
        self.listings
            .entry(market.to_string())
            .or_default()
            .push(Listing::new(code, name, market_cap));
        self
    }

    pub fn cancel_when_fetching(mut self, code: &str, flag: Arc<AtomicBool>) -> Self {
        self.cancel_on = Some((code.to_string(), flag));
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl DataPort for MockDataPort {
    fn fetch_daily_bars(
        &self,
        code: &str,
        market: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyBar>, ScreenerError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some((trigger, flag)) = &self.cancel_on {
            if trigger == code {
                flag.store(true, Ordering::SeqCst);
            }
        }
        if let Some(reason) = self.errors.get(code) {
            return Err(ScreenerError::Retrieval {
                code: code.to_string(),
                market: market.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(code)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_instruments(&self, market: &str) -> Result<Vec<Listing>, ScreenerError> {
        self.listings
            .get(market)
            .cloned()
            .ok_or_else(|| ScreenerError::UnknownMarket(market.to_string()))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Calendar day `i` counted from 2025-01-01.
pub fn day(i: usize) -> NaiveDate {
    date(2025, 1, 1) + chrono::Duration::days(i as i64)
}

pub fn make_bar(i: usize, open: f64, high: f64, low: f64, close: f64, volume: u64) -> DailyBar {
    DailyBar {
        date: day(i),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// `n` identical bars around `close`.
pub fn flat_bars(n: usize, close: f64, volume: u64) -> Vec<DailyBar> {
    (0..n)
        .map(|i| make_bar(i, close, close + 1.0, close - 1.0, close, volume))
        .collect()
}

/// 200 flat bars, a volume-backed jump at 200 (golden cross), a touch of the
/// short average at 204 and a bullish breakout at 206. Last bar is 209.
pub fn pattern_bars() -> Vec<DailyBar> {
    let mut bars = flat_bars(200, 100.0, 1000);
    for i in 200..204 {
        bars.push(make_bar(i, 109.0, 111.0, 109.0, 110.0, 5000));
    }
    bars.push(make_bar(204, 106.0, 106.5, 103.5, 104.0, 5000));
    bars.push(make_bar(205, 106.0, 106.5, 104.5, 105.0, 5000));
    bars.push(make_bar(206, 105.0, 108.5, 104.8, 108.0, 5000));
    for i in 207..210 {
        bars.push(make_bar(i, 108.0, 109.0, 107.0, 108.5, 5000));
    }
    bars
}

/// Golden cross at 200 that never comes back to the short average.
pub fn cross_without_pullback_bars() -> Vec<DailyBar> {
    let mut bars = flat_bars(200, 100.0, 1000);
    for i in 200..210 {
        bars.push(make_bar(i, 109.0, 111.0, 109.0, 110.0, 5000));
    }
    bars
}

/// Flat prices; volume steps from 1000 to 1800 for the last five bars.
pub fn volume_surge_bars(n: usize) -> Vec<DailyBar> {
    let mut bars = flat_bars(n, 100.0, 1000);
    for bar in bars.iter_mut().skip(n.saturating_sub(5)) {
        bar.volume = 1800;
    }
    bars
}

pub fn options(target: PatternTarget, as_of: NaiveDate, jobs: usize) -> ScreenOptions {
    ScreenOptions {
        target,
        as_of,
        history_days: 700,
        jobs,
    }
}
