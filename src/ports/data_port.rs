//! Market data access port.

use crate::domain::error::ScreenerError;
use crate::domain::ohlcv::DailyBar;
use crate::domain::universe::Listing;
use chrono::NaiveDate;

/// Source of daily bars and market listings.
///
/// Shared by every screener worker, hence `Send + Sync`.
pub trait DataPort: Send + Sync {
    /// Bars for `code` with `start_date <= date <= end_date`, in the order
    /// the source holds them. An unknown code yields an empty vector.
    fn fetch_daily_bars(
        &self,
        code: &str,
        market: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyBar>, ScreenerError>;

    /// All instruments listed on `market`, unranked.
    fn list_instruments(&self, market: &str) -> Result<Vec<Listing>, ScreenerError>;
}
