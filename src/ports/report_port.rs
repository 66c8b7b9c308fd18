//! Report output port.

use crate::domain::error::ScreenerError;
use crate::domain::screener::ScreenReport;
use std::path::Path;

/// Port for persisting a finished screen.
pub trait ReportPort {
    fn write(&self, report: &ScreenReport, output_path: &Path) -> Result<(), ScreenerError>;
}
