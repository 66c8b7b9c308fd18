//! CSV directory data adapter.
//!
//! Layout: `{code}_{market}.csv` with header `date,open,high,low,close,volume`
//! per instrument, plus an optional `listing_{market}.csv` with header
//! `code,name,market_cap`.

use crate::domain::error::ScreenerError;
use crate::domain::ohlcv::DailyBar;
use crate::domain::universe::Listing;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::str::FromStr;

const LISTING_PREFIX: &str = "listing";

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ListingRecord {
    code: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    market_cap: Option<u64>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str, market: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", code, market))
    }

    fn listing_path(&self, market: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", LISTING_PREFIX, market))
    }

    fn read_listing_file(
        &self,
        market: &str,
        content: &str,
    ) -> Result<Vec<Listing>, ScreenerError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut listings = Vec::new();

        for record in rdr.deserialize::<ListingRecord>() {
            let record = record.map_err(|e| ScreenerError::Retrieval {
                code: LISTING_PREFIX.to_string(),
                market: market.to_string(),
                reason: format!("listing parse error: {}", e),
            })?;
            listings.push(Listing::new(
                record.code.to_uppercase(),
                record.name,
                record.market_cap.unwrap_or(0),
            ));
        }

        Ok(listings)
    }

    fn scan_directory(&self, market: &str) -> Result<Vec<Listing>, ScreenerError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| ScreenerError::Retrieval {
            code: LISTING_PREFIX.to_string(),
            market: market.to_string(),
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let suffix = format!("_{}.csv", market);
        let mut codes = Vec::new();

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(code) = name_str.strip_suffix(&suffix) {
                if !code.is_empty() && code != LISTING_PREFIX {
                    codes.push(code.to_string());
                }
            }
        }

        codes.sort();
        Ok(codes
            .into_iter()
            .map(|code| Listing::new(code, "", 0))
            .collect())
    }
}

fn parse_field<T>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    code: &str,
) -> Result<T, ScreenerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = record.get(index).ok_or_else(|| ScreenerError::DataIntegrity {
        code: code.to_string(),
        reason: format!("missing {} column", name),
    })?;
    raw.trim().parse().map_err(|e| ScreenerError::DataIntegrity {
        code: code.to_string(),
        reason: format!("invalid {} value '{}': {}", name, raw, e),
    })
}

/// Price column; an empty cell is a missing price and reads as NaN.
fn parse_price(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    code: &str,
) -> Result<f64, ScreenerError> {
    match record.get(index) {
        Some(raw) if raw.trim().is_empty() => Ok(f64::NAN),
        _ => parse_field(record, index, name, code),
    }
}

impl DataPort for CsvAdapter {
    /// Bars in file order; ordering problems are left for
    /// `InstrumentSeries` to report. A missing file yields no bars.
    fn fetch_daily_bars(
        &self,
        code: &str,
        market: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyBar>, ScreenerError> {
        let path = self.csv_path(code, market);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ScreenerError::Retrieval {
                    code: code.to_string(),
                    market: market.to_string(),
                    reason: format!("failed to read {}: {}", path.display(), e),
                })
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| ScreenerError::DataIntegrity {
                code: code.to_string(),
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(0).ok_or_else(|| ScreenerError::DataIntegrity {
                code: code.to_string(),
                reason: "missing date column".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                ScreenerError::DataIntegrity {
                    code: code.to_string(),
                    reason: format!("invalid date format '{}': {}", date_str, e),
                }
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            bars.push(DailyBar {
                date,
                open: parse_price(&record, 1, "open", code)?,
                high: parse_price(&record, 2, "high", code)?,
                low: parse_price(&record, 3, "low", code)?,
                close: parse_price(&record, 4, "close", code)?,
                volume: parse_field(&record, 5, "volume", code)?,
            });
        }

        Ok(bars)
    }

    /// Listing file when present, otherwise every `*_{market}.csv` in the
    /// directory with unknown market cap.
    fn list_instruments(&self, market: &str) -> Result<Vec<Listing>, ScreenerError> {
        let listings = match fs::read_to_string(self.listing_path(market)) {
            Ok(content) => self.read_listing_file(market, &content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(market, "no listing file, scanning data directory");
                self.scan_directory(market)?
            }
            Err(e) => return Err(e.into()),
        };

        if listings.is_empty() {
            return Err(ScreenerError::UnknownMarket(market.to_string()));
        }
        Ok(listings)
    }
}
