//! Universe screener.
//!
//! Fans a market's listings out over a bounded rayon pool. Workers fetch and
//! scan one instrument at a time and send the outcome over a channel; the
//! calling thread is the only aggregator, so the report and the progress
//! callback never see concurrent access. Cancellation is cooperative: each
//! worker checks the flag before starting an instrument and in-flight
//! instruments finish normally.

use crate::domain::error::ScreenerError;
use crate::domain::scan::{scan_instrument, ScanResult};
use crate::domain::scan_params::{PatternTarget, ScanParams};
use crate::domain::series::InstrumentSeries;
use crate::domain::session::history_window;
use crate::domain::universe::{select_universe, Listing, SkipReason, SkippedCode};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenOptions {
    pub target: PatternTarget,
    pub as_of: NaiveDate,
    /// Calendar days of history requested before `as_of`.
    pub history_days: u32,
    /// Worker threads.
    pub jobs: usize,
}

/// Which listings of a market get scanned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniverseSelection {
    /// Largest N by market cap; 0 keeps every listing.
    pub top_n: usize,
    pub codes: Option<Vec<String>>,
    /// Scan requested codes the market does not list. Only meaningful when a
    /// single market is screened.
    pub include_unlisted: bool,
}

/// Snapshot handed to the progress callback after each instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanProgress {
    pub market: String,
    pub current: usize,
    pub total: usize,
    pub found: usize,
    pub failed: usize,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenRow {
    pub rank: usize,
    pub code: String,
    pub name: String,
    pub market_cap: u64,
    pub result: ScanResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenReport {
    pub market: String,
    pub target: PatternTarget,
    pub as_of: NaiveDate,
    /// Hits ordered by market-cap rank.
    pub rows: Vec<ScreenRow>,
    pub skipped: Vec<SkippedCode>,
    pub processed: usize,
    pub total: usize,
    pub cancelled: bool,
    pub elapsed_secs: f64,
}

impl ScreenReport {
    pub fn hit_count(&self) -> usize {
        self.rows.len()
    }

    pub fn failed_count(&self) -> usize {
        self.skipped.iter().filter(|s| s.reason.is_failure()).count()
    }
}

enum Outcome {
    Hit(ScreenRow),
    Miss,
    Skipped { rank: usize, skipped: SkippedCode },
}

/// Fetch and scan a single listing as of `options.as_of`.
///
/// `Ok(None)` means the instrument was scanned and shows no pattern.
pub fn scan_listing(
    port: &dyn DataPort,
    code: &str,
    market: &str,
    params: &ScanParams,
    options: &ScreenOptions,
) -> Result<Option<ScanResult>, ScreenerError> {
    let (start, end) = history_window(options.as_of, options.history_days);
    let bars = port.fetch_daily_bars(code, market, start, end)?;
    if bars.is_empty() {
        return Err(ScreenerError::NoData {
            code: code.to_string(),
            market: market.to_string(),
        });
    }

    let series = InstrumentSeries::new(code.to_string(), market.to_string(), bars)?
        .up_to(options.as_of);
    if series.is_empty() {
        return Err(ScreenerError::NoData {
            code: code.to_string(),
            market: market.to_string(),
        });
    }

    let minimum = params.min_history_for(options.target);
    if series.len() < minimum {
        return Err(ScreenerError::InsufficientHistory {
            code: code.to_string(),
            bars: series.len(),
            minimum,
        });
    }

    Ok(scan_instrument(&series, params, options.target))
}

fn evaluate(
    port: &dyn DataPort,
    listing: &Listing,
    market: &str,
    params: &ScanParams,
    options: &ScreenOptions,
) -> Result<Outcome, ScreenerError> {
    match scan_listing(port, &listing.code, market, params, options) {
        Ok(Some(result)) => {
            tracing::debug!(code = %listing.code, market, "pattern found");
            Ok(Outcome::Hit(ScreenRow {
                rank: listing.rank,
                code: listing.code.clone(),
                name: listing.name.clone(),
                market_cap: listing.market_cap,
                result,
            }))
        }
        Ok(None) => Ok(Outcome::Miss),
        Err(err) => {
            let Some(reason) = SkipReason::from_error(&err) else {
                return Err(err);
            };
            if reason.is_failure() {
                tracing::warn!(code = %listing.code, market, error = %err, "skipping instrument");
            } else {
                tracing::debug!(
                    code = %listing.code,
                    market,
                    reason = %reason,
                    "skipping instrument"
                );
            }
            Ok(Outcome::Skipped {
                rank: listing.rank,
                skipped: SkippedCode {
                    code: listing.code.clone(),
                    reason,
                },
            })
        }
    }
}

/// Scan `listings` of one market on `options.jobs` worker threads.
///
/// Per-instrument failures become skips. A run-level error from a worker
/// (anything that is not per-instrument) stops the remaining workers and is
/// returned once in-flight instruments drain.
pub fn run_screen(
    port: &dyn DataPort,
    listings: &[Listing],
    market: &str,
    params: &ScanParams,
    options: &ScreenOptions,
    progress: Option<&dyn Fn(&ScanProgress)>,
    cancel: &AtomicBool,
) -> Result<ScreenReport, ScreenerError> {
    let started = Instant::now();
    let total = listings.len();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs.max(1))
        .build()
        .map_err(|e| ScreenerError::ConfigInvalid {
            section: "scan".to_string(),
            key: "jobs".to_string(),
            reason: format!("cannot start worker pool: {}", e),
        })?;

    tracing::info!(
        market,
        total,
        jobs = options.jobs,
        target = %options.target,
        as_of = %options.as_of,
        "screen started"
    );

    let halt = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel::<Result<Outcome, ScreenerError>>();

    let mut rows = Vec::new();
    let mut skipped: Vec<(usize, SkippedCode)> = Vec::new();
    let mut processed = 0usize;
    let mut failed = 0usize;
    let mut fatal = None;

    std::thread::scope(|scope| {
        let halt = &halt;
        scope.spawn(move || {
            pool.install(|| {
                listings.par_iter().for_each_with(tx, |tx, listing| {
                    if cancel.load(Ordering::Relaxed) || halt.load(Ordering::Relaxed) {
                        return;
                    }
                    let outcome = evaluate(port, listing, market, params, options);
                    if outcome.is_err() {
                        halt.store(true, Ordering::Relaxed);
                    }
                    // receiver outlives every sender
                    let _ = tx.send(outcome);
                });
            });
        });

        for outcome in rx {
            match outcome {
                Ok(Outcome::Hit(row)) => rows.push(row),
                Ok(Outcome::Miss) => {}
                Ok(Outcome::Skipped { rank, skipped: s }) => {
                    if s.reason.is_failure() {
                        failed += 1;
                    }
                    skipped.push((rank, s));
                }
                Err(err) => {
                    fatal.get_or_insert(err);
                    continue;
                }
            }
            processed += 1;

            if let Some(cb) = progress {
                cb(&ScanProgress {
                    market: market.to_string(),
                    current: processed,
                    total,
                    found: rows.len(),
                    failed,
                    elapsed_secs: started.elapsed().as_secs_f64(),
                });
            }
        }
    });

    if let Some(err) = fatal {
        return Err(err);
    }

    rows.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.code.cmp(&b.code)));
    skipped.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.code.cmp(&b.1.code)));

    let cancelled = processed < total && cancel.load(Ordering::Relaxed);
    let elapsed_secs = started.elapsed().as_secs_f64();

    if cancelled {
        tracing::warn!(market, processed, total, "screen cancelled");
    }
    tracing::info!(
        market,
        processed,
        found = rows.len(),
        skipped = skipped.len(),
        elapsed_secs,
        "screen finished"
    );

    Ok(ScreenReport {
        market: market.to_string(),
        target: options.target,
        as_of: options.as_of,
        rows,
        skipped: skipped.into_iter().map(|(_, s)| s).collect(),
        processed,
        total,
        cancelled,
        elapsed_secs,
    })
}

/// List `market`, select the universe and screen it.
///
/// A failed listing request is fatal for the market.
pub fn screen_market(
    port: &dyn DataPort,
    market: &str,
    selection: &UniverseSelection,
    params: &ScanParams,
    options: &ScreenOptions,
    progress: Option<&dyn Fn(&ScanProgress)>,
    cancel: &AtomicBool,
) -> Result<ScreenReport, ScreenerError> {
    let listings = port.list_instruments(market)?;
    let universe = select_universe(
        listings,
        selection.top_n,
        selection.codes.as_deref(),
        selection.include_unlisted,
    );
    tracing::info!(market, instruments = universe.len(), "universe selected");
    run_screen(port, &universe, market, params, options, progress, cancel)
}
