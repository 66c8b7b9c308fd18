//! CLI definition and dispatch.

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::throttled_data_port::{ThrottleConfig, ThrottledDataPort};
use crate::domain::config_validation::{parse_as_of, parse_markets, validate_config};
use crate::domain::error::ScreenerError;
use crate::domain::scan::ScanResult;
use crate::domain::scan_params::{PatternTarget, ScanParams, TouchBand};
use crate::domain::screener::{
    screen_market, ScanProgress, ScreenOptions, ScreenReport, UniverseSelection,
};
use crate::domain::session::{
    last_completed_session, DEFAULT_HISTORY_DAYS, DEFAULT_SESSION_CLOSE_HOUR,
};
use crate::domain::universe::{parse_codes, select_universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const STOP_FILE_POLL: Duration = Duration::from_millis(200);
const PROGRESS_EVERY: usize = 50;

#[derive(Parser, Debug)]
#[command(name = "gcscan", about = "Golden-cross pullback equity screener")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Screen the configured markets
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        /// price-cross | volume-ratio | pullback | all
        #[arg(long)]
        target: Option<PatternTarget>,
        /// Reference session (YYYY-MM-DD); defaults to the last completed one
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long)]
        top_n: Option<usize>,
        /// Scan only this market
        #[arg(long)]
        market: Option<String>,
        #[arg(long)]
        jobs: Option<usize>,
        /// CSV report path; `{market}` is replaced by the market name
        #[arg(short, long)]
        output: Option<String>,
        /// Print each hit as a JSON line on stdout
        #[arg(long)]
        json: bool,
        /// Stop after in-flight instruments once this file exists
        #[arg(long)]
        stop_file: Option<PathBuf>,
    },
    /// Validate a configuration file and print the resolved parameters
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List a market's instruments ranked by market cap
    ListSymbols {
        #[arg(long)]
        market: String,
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        top_n: Option<usize>,
    },
}

/// Scan overrides given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ScanOverrides {
    pub target: Option<PatternTarget>,
    pub as_of: Option<NaiveDate>,
    pub top_n: Option<usize>,
    pub market: Option<String>,
    pub jobs: Option<usize>,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Scan {
            config,
            target,
            as_of,
            top_n,
            market,
            jobs,
            output,
            json,
            stop_file,
        } => {
            let overrides = ScanOverrides {
                target,
                as_of,
                top_n,
                market,
                jobs,
            };
            run_scan(&config, &overrides, output.as_deref(), json, stop_file.as_deref())
        }
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols {
            market,
            config,
            top_n,
        } => run_list_symbols(&market, &config, top_n),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    // a second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ScreenerError> {
    FileConfigAdapter::from_file(path).map_err(|e| ScreenerError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn usize_value(config: &dyn ConfigPort, section: &str, key: &str, default: usize) -> usize {
    usize::try_from(config.get_int(section, key, default as i64)).unwrap_or(default)
}

pub fn build_scan_params(config: &dyn ConfigPort) -> Result<ScanParams, ScreenerError> {
    let defaults = ScanParams::default();
    let touch_band = match config.get_string("pattern", "touch_band") {
        Some(s) if !s.trim().is_empty() => {
            s.parse::<TouchBand>()
                .map_err(|reason| ScreenerError::ConfigInvalid {
                    section: "pattern".to_string(),
                    key: "touch_band".to_string(),
                    reason,
                })?
        }
        _ => defaults.touch_band,
    };

    let params = ScanParams {
        price_ma_short: usize_value(config, "pattern", "price_ma_short", defaults.price_ma_short),
        price_ma_long: usize_value(config, "pattern", "price_ma_long", defaults.price_ma_long),
        crossover_lookback: usize_value(
            config,
            "pattern",
            "crossover_lookback",
            defaults.crossover_lookback,
        ),
        volume_gate: config.get_bool("pattern", "volume_gate", defaults.volume_gate),
        pullback_min: usize_value(config, "pattern", "pullback_min", defaults.pullback_min),
        pullback_max: usize_value(config, "pattern", "pullback_max", defaults.pullback_max),
        touch_margin: config.get_double("pattern", "touch_margin", defaults.touch_margin),
        touch_band,
        signal_lookback: usize_value(
            config,
            "pattern",
            "signal_lookback",
            defaults.signal_lookback,
        ),
        volume_ma_ultra_short: usize_value(
            config,
            "pattern",
            "volume_ma_ultra_short",
            defaults.volume_ma_ultra_short,
        ),
        volume_ma_short: usize_value(
            config,
            "pattern",
            "volume_ma_short",
            defaults.volume_ma_short,
        ),
    };
    params.validate()?;
    Ok(params)
}

pub fn build_throttle_config(config: &dyn ConfigPort) -> ThrottleConfig {
    let defaults = ThrottleConfig::default();
    ThrottleConfig {
        requests_per_second: config
            .get_double("throttle", "requests_per_second", defaults.requests_per_second)
            .max(0.0),
        burst: u32::try_from(config.get_int("throttle", "burst", i64::from(defaults.burst)))
            .unwrap_or(defaults.burst),
        max_retries: u32::try_from(config.get_int(
            "throttle",
            "max_retries",
            i64::from(defaults.max_retries),
        ))
        .unwrap_or(defaults.max_retries),
        backoff_ms: u64::try_from(config.get_int(
            "throttle",
            "backoff_ms",
            defaults.backoff_ms as i64,
        ))
        .unwrap_or(defaults.backoff_ms),
    }
}

/// Resolve target, as-of date, history and worker count. `now` is the local
/// wall clock used when no as-of date is configured.
pub fn build_screen_options(
    config: &dyn ConfigPort,
    overrides: &ScanOverrides,
    now: NaiveDateTime,
) -> Result<ScreenOptions, ScreenerError> {
    let target = match overrides.target {
        Some(t) => t,
        None => match config.get_string("scan", "target") {
            Some(s) if !s.trim().is_empty() => {
                s.parse::<PatternTarget>()
                    .map_err(|reason| ScreenerError::ConfigInvalid {
                        section: "scan".to_string(),
                        key: "target".to_string(),
                        reason,
                    })?
            }
            _ => PatternTarget::Pullback,
        },
    };

    let as_of = match overrides.as_of {
        Some(d) => d,
        None => match config.get_string("scan", "as_of") {
            Some(s) if !s.trim().is_empty() => parse_as_of(&s)?,
            _ => {
                let close_hour = config.get_int(
                    "scan",
                    "session_close_hour",
                    i64::from(DEFAULT_SESSION_CLOSE_HOUR),
                );
                let close_hour = u32::try_from(close_hour).unwrap_or(DEFAULT_SESSION_CLOSE_HOUR);
                last_completed_session(now, close_hour)
            }
        },
    };

    let history_days = u32::try_from(config.get_int(
        "scan",
        "history_days",
        i64::from(DEFAULT_HISTORY_DAYS),
    ))
    .unwrap_or(DEFAULT_HISTORY_DAYS);

    let jobs = overrides
        .jobs
        .unwrap_or_else(|| usize_value(config, "scan", "jobs", default_jobs()))
        .max(1);

    Ok(ScreenOptions {
        target,
        as_of,
        history_days,
        jobs,
    })
}

fn default_jobs() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub fn resolve_markets(
    config: &dyn ConfigPort,
    market_override: Option<&str>,
) -> Result<Vec<String>, ScreenerError> {
    match market_override {
        Some(m) => parse_markets(m),
        None => match config.get_string("universe", "markets") {
            Some(m) => parse_markets(&m),
            None => Err(ScreenerError::ConfigMissing {
                section: "universe".to_string(),
                key: "markets".to_string(),
            }),
        },
    }
}

/// Codes from `[universe] codes` that a market does not list are scanned
/// only when `single_market` is set; with several markets they belong
/// elsewhere.
pub fn build_universe_selection(
    config: &dyn ConfigPort,
    top_n_override: Option<usize>,
    single_market: bool,
) -> Result<UniverseSelection, ScreenerError> {
    let top_n = top_n_override.unwrap_or_else(|| usize_value(config, "universe", "top_n", 0));
    let codes = match config.get_string("universe", "codes") {
        Some(c) if !c.trim().is_empty() => Some(parse_codes(&c)?),
        _ => None,
    };
    Ok(UniverseSelection {
        top_n,
        codes,
        include_unlisted: single_market,
    })
}

/// `template` with `{market}` substituted.
pub fn output_path_for(template: &str, market: &str) -> PathBuf {
    PathBuf::from(template.replace("{market}", market))
}

fn data_port(config: &dyn ConfigPort) -> Result<ThrottledDataPort<CsvAdapter>, ScreenerError> {
    let path = config
        .get_string("data", "path")
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ScreenerError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        })?;
    Ok(ThrottledDataPort::new(
        CsvAdapter::new(PathBuf::from(path)),
        &build_throttle_config(config),
    ))
}

/// Polls for `path` and raises `cancel` when it appears, until `done` is set.
pub fn spawn_stop_file_watcher(
    path: PathBuf,
    cancel: Arc<AtomicBool>,
    done: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !done.load(Ordering::Relaxed) {
            if path.exists() {
                tracing::warn!(path = %path.display(), "stop file found, cancelling scan");
                cancel.store(true, Ordering::Relaxed);
                return;
            }
            thread::sleep(STOP_FILE_POLL);
        }
    })
}

fn log_progress(p: &ScanProgress) {
    if p.current % PROGRESS_EVERY == 0 || p.current == p.total {
        tracing::info!(
            market = %p.market,
            current = p.current,
            total = p.total,
            found = p.found,
            failed = p.failed,
            elapsed_secs = p.elapsed_secs,
            "progress"
        );
    }
}

fn describe(result: &ScanResult) -> String {
    let mut parts = Vec::new();
    if let Some(pb) = &result.pullback {
        parts.push(format!(
            "cross {} pullback {} (low {:.2}) signal {} [{}]",
            pb.crossover.date,
            pb.pullback.date,
            pb.pullback.low_price,
            pb.signal.date,
            pb.signal.kind.as_str()
        ));
    } else if let Some(pc) = &result.price_cross {
        let gap = pc
            .gap_pct
            .map(|g| format!("{:+.2}%", g))
            .unwrap_or_else(|| "n/a".to_string());
        parts.push(format!("cross {} gap {}", pc.crossover.date, gap));
    }
    if let Some(vr) = &result.volume_ratio {
        parts.push(format!("volume x{:.2}", vr.ratio));
    }
    parts.join("; ")
}

fn print_report(report: &ScreenReport, json: bool) -> Result<(), ScreenerError> {
    eprintln!(
        "\n=== {} ({}, as of {}) ===",
        report.market, report.target, report.as_of
    );
    for row in &report.rows {
        if json {
            let line = serde_json::to_string(row)
                .map_err(|e| ScreenerError::Io(std::io::Error::other(e)))?;
            println!("{}", line);
        } else {
            println!(
                "{:>4}  {:<8} {:<24} {:>10.2}  {}",
                row.rank,
                row.code,
                row.name,
                row.result.last_close,
                describe(&row.result)
            );
        }
    }
    eprintln!(
        "{} hits, {} of {} processed, {} skipped ({} failed), {:.1}s{}",
        report.hit_count(),
        report.processed,
        report.total,
        report.skipped.len(),
        report.failed_count(),
        report.elapsed_secs,
        if report.cancelled { ", cancelled" } else { "" }
    );
    Ok(())
}

fn run_scan(
    config_path: &Path,
    overrides: &ScanOverrides,
    output: Option<&str>,
    json: bool,
    stop_file: Option<&Path>,
) -> Result<(), ScreenerError> {
    let config = load_config(config_path)?;
    init_logging(
        &config
            .get_string("logging", "level")
            .unwrap_or_else(|| "info".to_string()),
    );
    tracing::info!(path = %config_path.display(), "config loaded");

    validate_config(&config)?;
    let params = build_scan_params(&config)?;
    let options = build_screen_options(&config, overrides, Local::now().naive_local())?;
    let markets = resolve_markets(&config, overrides.market.as_deref())?;
    let selection = build_universe_selection(&config, overrides.top_n, markets.len() == 1)?;
    let port = data_port(&config)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let done = Arc::new(AtomicBool::new(false));
    let watcher = stop_file
        .map(|p| spawn_stop_file_watcher(p.to_path_buf(), Arc::clone(&cancel), Arc::clone(&done)));

    let outcome = scan_markets(
        &port, &markets, &selection, &params, &options, output, json, &cancel,
    );

    done.store(true, Ordering::Relaxed);
    if let Some(handle) = watcher {
        let _ = handle.join();
    }
    outcome
}

#[allow(clippy::too_many_arguments)]
fn scan_markets(
    port: &dyn DataPort,
    markets: &[String],
    selection: &UniverseSelection,
    params: &ScanParams,
    options: &ScreenOptions,
    output: Option<&str>,
    json: bool,
    cancel: &AtomicBool,
) -> Result<(), ScreenerError> {
    let progress: &dyn Fn(&ScanProgress) = &log_progress;
    for market in markets {
        if cancel.load(Ordering::Relaxed) {
            tracing::warn!(market = %market, "skipping market after cancellation");
            break;
        }
        let report = screen_market(
            port,
            market,
            selection,
            params,
            options,
            Some(progress),
            cancel,
        )?;
        print_report(&report, json)?;

        if let Some(template) = output {
            CsvReportAdapter.write(&report, &output_path_for(template, market))?;
        }
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), ScreenerError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_config(config_path)?;
    validate_config(&config)?;

    let params = build_scan_params(&config)?;
    let options = build_screen_options(
        &config,
        &ScanOverrides::default(),
        Local::now().naive_local(),
    )?;
    let markets = resolve_markets(&config, None)?;
    let selection = build_universe_selection(&config, None, markets.len() == 1)?;
    let throttle = build_throttle_config(&config);

    eprintln!("Config validated successfully");
    eprintln!("\nScan:");
    eprintln!("  target:        {}", options.target);
    eprintln!("  as of:         {}", options.as_of);
    eprintln!("  history days:  {}", options.history_days);
    eprintln!("  jobs:          {}", options.jobs);
    eprintln!("\nUniverse:");
    eprintln!("  markets:       {}", markets.join(", "));
    eprintln!(
        "  top n:         {}",
        if selection.top_n == 0 {
            "all".to_string()
        } else {
            selection.top_n.to_string()
        }
    );
    if let Some(codes) = &selection.codes {
        eprintln!("  codes:         {}", codes.join(", "));
    }
    eprintln!("\nPattern:");
    eprintln!(
        "  price MA:      {} / {}",
        params.price_ma_short, params.price_ma_long
    );
    eprintln!(
        "  crossover:     last {} bars, volume gate {}",
        params.crossover_lookback,
        if params.volume_gate { "on" } else { "off" }
    );
    eprintln!(
        "  pullback:      +{}..+{} bars, margin {:.2}% ({:?})",
        params.pullback_min,
        params.pullback_max,
        params.touch_margin * 100.0,
        params.touch_band
    );
    eprintln!("  signal:        within {} bars", params.signal_lookback);
    eprintln!(
        "  volume ratio:  MA{} / MA{}",
        params.volume_ma_ultra_short, params.volume_ma_short
    );
    eprintln!("\nThrottle:");
    if throttle.requests_per_second > 0.0 {
        eprintln!(
            "  rate:          {} req/s, burst {}",
            throttle.requests_per_second, throttle.burst
        );
    } else {
        eprintln!("  rate:          unlimited");
    }
    eprintln!(
        "  retries:       {} (backoff {} ms)",
        throttle.max_retries, throttle.backoff_ms
    );

    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

fn run_list_symbols(
    market: &str,
    config_path: &Path,
    top_n: Option<usize>,
) -> Result<(), ScreenerError> {
    let config = load_config(config_path)?;
    init_logging(
        &config
            .get_string("logging", "level")
            .unwrap_or_else(|| "warn".to_string()),
    );
    let market = parse_markets(market)?
        .into_iter()
        .next()
        .ok_or_else(|| ScreenerError::UnknownMarket(market.to_string()))?;
    let port = data_port(&config)?;

    let listings = select_universe(
        port.list_instruments(&market)?,
        top_n.unwrap_or(0),
        None,
        false,
    );
    for listing in &listings {
        println!(
            "{:>4}  {:<8} {:<24} {}",
            listing.rank, listing.code, listing.name, listing.market_cap
        );
    }
    eprintln!("{} symbols found on {}", listings.len(), market);
    Ok(())
}
