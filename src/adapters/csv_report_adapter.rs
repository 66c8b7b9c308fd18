//! CSV report adapter: one row per hit, ordered by market-cap rank.

use crate::domain::error::ScreenerError;
use crate::domain::screener::{ScreenReport, ScreenRow};
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::Path;

const HEADER: [&str; 17] = [
    "rank",
    "code",
    "name",
    "market_cap",
    "last_close",
    "crossover_date",
    "ma_short",
    "ma_long",
    "ma_gap_pct",
    "pullback_date",
    "pullback_low",
    "signal_date",
    "signal_kind",
    "volume_last",
    "vol_ma_ultra_short",
    "vol_ma_short",
    "volume_ratio",
];

pub struct CsvReportAdapter;

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn fmt2(value: f64) -> String {
    format!("{:.2}", value)
}

fn row_fields(row: &ScreenRow) -> Vec<String> {
    let result = &row.result;
    let cross = result.price_cross.as_ref();
    let pullback = result.pullback.as_ref();
    let volume = result.volume_ratio.as_ref();

    vec![
        row.rank.to_string(),
        row.code.clone(),
        row.name.clone(),
        row.market_cap.to_string(),
        fmt2(result.last_close),
        opt(cross
            .map(|c| c.crossover.date)
            .or_else(|| pullback.map(|p| p.crossover.date))),
        opt(cross.map(|c| fmt2(c.ma_short))),
        opt(cross.map(|c| fmt2(c.ma_long))),
        opt(cross.and_then(|c| c.gap_pct).map(fmt2)),
        opt(pullback.map(|p| p.pullback.date)),
        opt(pullback.map(|p| fmt2(p.pullback.low_price))),
        opt(pullback.map(|p| p.signal.date)),
        opt(pullback.map(|p| p.signal.kind.as_str())),
        opt(volume.map(|v| v.last_volume)),
        opt(volume.map(|v| fmt2(v.ma_ultra_short))),
        opt(volume.map(|v| fmt2(v.ma_short))),
        opt(volume.map(|v| fmt2(v.ratio))),
    ]
}

impl CsvReportAdapter {
    pub fn render(report: &ScreenReport) -> Result<String, ScreenerError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(HEADER).map_err(csv_error)?;
        for row in &report.rows {
            writer.write_record(row_fields(row)).map_err(csv_error)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ScreenerError::Io(std::io::Error::other(e.to_string())))?;
        String::from_utf8(bytes).map_err(|e| ScreenerError::Io(std::io::Error::other(e)))
    }
}

fn csv_error(e: csv::Error) -> ScreenerError {
    ScreenerError::Io(std::io::Error::other(e))
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, report: &ScreenReport, output_path: &Path) -> Result<(), ScreenerError> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = Self::render(report)?;
        fs::write(output_path, content)?;
        tracing::info!(path = %output_path.display(), rows = report.rows.len(), "report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::crossover::CrossoverEvent;
    use crate::domain::pullback::{PullbackEvent, SignalEvent, SignalKind};
    use crate::domain::scan::{PriceCrossSummary, PullbackSummary, ScanResult, VolumeRatioSummary};
    use crate::domain::scan_params::PatternTarget;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    fn sample_report() -> ScreenReport {
        let crossover = CrossoverEvent {
            index: 200,
            date: day(2),
        };
        let full = ScanResult {
            code: "005930".into(),
            as_of: day(20),
            last_close: 108.5,
            price_cross: Some(PriceCrossSummary {
                crossover,
                ma_short: 104.13,
                ma_long: 100.41,
                gap_pct: Some(3.7),
            }),
            pullback: Some(PullbackSummary {
                crossover,
                pullback: PullbackEvent {
                    index: 204,
                    date: day(6),
                    low_price: 103.5,
                },
                signal: SignalEvent {
                    index: 206,
                    date: day(10),
                    kind: SignalKind::Historic,
                },
            }),
            volume_ratio: None,
        };
        let volume_only = ScanResult {
            code: "000660".into(),
            as_of: day(20),
            last_close: 50.0,
            price_cross: None,
            pullback: None,
            volume_ratio: Some(VolumeRatioSummary {
                ratio: 1.5,
                last_volume: 1800,
                ma_ultra_short: 1500.0,
                ma_short: 1000.0,
            }),
        };

        ScreenReport {
            market: "KOSPI".into(),
            target: PatternTarget::All,
            as_of: day(20),
            rows: vec![
                ScreenRow {
                    rank: 1,
                    code: "005930".into(),
                    name: "Samsung Electronics".into(),
                    market_cap: 400,
                    result: full,
                },
                ScreenRow {
                    rank: 2,
                    code: "000660".into(),
                    name: "SK hynix".into(),
                    market_cap: 100,
                    result: volume_only,
                },
            ],
            skipped: Vec::new(),
            processed: 2,
            total: 2,
            cancelled: false,
            elapsed_secs: 0.1,
        }
    }

    #[test]
    fn render_has_header_and_rows() {
        let csv = CsvReportAdapter::render(&sample_report()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("rank,code,name,market_cap,last_close"));
        assert_eq!(
            lines[1],
            "1,005930,Samsung Electronics,400,108.50,2026-02-02,104.13,100.41,3.70,\
             2026-02-06,103.50,2026-02-10,historic,,,,"
        );
    }

    #[test]
    fn absent_values_are_empty_cells() {
        let csv = CsvReportAdapter::render(&sample_report()).unwrap();
        let line = csv.lines().nth(2).unwrap();
        assert_eq!(line, "2,000660,SK hynix,100,50.00,,,,,,,,,1800,1500.00,1000.00,1.50");
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("KOSPI.csv");

        CsvReportAdapter.write(&sample_report(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
    }
}
