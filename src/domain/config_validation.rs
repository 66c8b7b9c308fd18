//! Configuration validation.
//!
//! Checks every section of the screener INI before any data is touched, so a
//! bad value fails the run up front instead of surfacing per instrument.

use crate::domain::error::ScreenerError;
use crate::domain::scan_params::{PatternTarget, TouchBand};
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    validate_data(config)?;
    validate_universe(config)?;
    validate_scan(config)?;
    validate_pattern(config)?;
    validate_throttle(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> ScreenerError {
    ScreenerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn present(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Integer value if set; rejects text `get_int` would silently replace.
fn int_value(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<i64>, ScreenerError> {
    match present(config, section, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("{} must be an integer", key))),
    }
}

fn float_value(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, ScreenerError> {
    match present(config, section, key) {
        None => Ok(None),
        Some(raw) => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(invalid(section, key, format!("{} must be a number", key))),
        },
    }
}

fn validate_positive(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), ScreenerError> {
    if let Some(v) = int_value(config, section, key)? {
        if v < 1 {
            return Err(invalid(section, key, format!("{} must be positive", key)));
        }
    }
    Ok(())
}

fn validate_non_negative(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), ScreenerError> {
    if let Some(v) = int_value(config, section, key)? {
        if v < 0 {
            return Err(invalid(section, key, format!("{} must be non-negative", key)));
        }
    }
    Ok(())
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    match present(config, "data", "path") {
        Some(_) => Ok(()),
        None => Err(ScreenerError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        }),
    }
}

/// Split a comma-separated market list; names must be alphanumeric.
pub fn parse_markets(input: &str) -> Result<Vec<String>, ScreenerError> {
    let mut markets = Vec::new();
    for token in input.split(',') {
        let market = token.trim().to_uppercase();
        if market.is_empty() || !market.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid(
                "universe",
                "markets",
                format!("invalid market name '{}'", token.trim()),
            ));
        }
        if !markets.contains(&market) {
            markets.push(market);
        }
    }
    Ok(markets)
}

fn validate_universe(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    let markets =
        present(config, "universe", "markets").ok_or_else(|| ScreenerError::ConfigMissing {
            section: "universe".to_string(),
            key: "markets".to_string(),
        })?;
    parse_markets(&markets)?;

    validate_non_negative(config, "universe", "top_n")?;

    if let Some(codes) = present(config, "universe", "codes") {
        parse_codes(&codes)?;
    }
    Ok(())
}

pub fn parse_as_of(value: &str) -> Result<NaiveDate, ScreenerError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| invalid("scan", "as_of", "invalid as_of format, expected YYYY-MM-DD"))
}

fn validate_scan(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    if let Some(target) = present(config, "scan", "target") {
        target
            .parse::<PatternTarget>()
            .map_err(|e| invalid("scan", "target", e))?;
    }

    if let Some(as_of) = present(config, "scan", "as_of") {
        parse_as_of(&as_of)?;
    }

    validate_positive(config, "scan", "history_days")?;
    validate_positive(config, "scan", "jobs")?;

    if let Some(hour) = int_value(config, "scan", "session_close_hour")? {
        if !(0..=23).contains(&hour) {
            return Err(invalid(
                "scan",
                "session_close_hour",
                "session_close_hour must be between 0 and 23",
            ));
        }
    }
    Ok(())
}

fn validate_pattern(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    for key in [
        "price_ma_short",
        "price_ma_long",
        "crossover_lookback",
        "signal_lookback",
        "volume_ma_ultra_short",
        "volume_ma_short",
    ] {
        validate_positive(config, "pattern", key)?;
    }
    validate_non_negative(config, "pattern", "pullback_min")?;
    validate_non_negative(config, "pattern", "pullback_max")?;

    let short = int_value(config, "pattern", "price_ma_short")?.unwrap_or(20);
    let long = int_value(config, "pattern", "price_ma_long")?.unwrap_or(200);
    if short >= long {
        return Err(invalid(
            "pattern",
            "price_ma_short",
            "price_ma_short must be shorter than price_ma_long",
        ));
    }

    let min = int_value(config, "pattern", "pullback_min")?.unwrap_or(3);
    let max = int_value(config, "pattern", "pullback_max")?.unwrap_or(10);
    if min > max {
        return Err(invalid(
            "pattern",
            "pullback_min",
            "pullback_min must not exceed pullback_max",
        ));
    }

    if let Some(margin) = float_value(config, "pattern", "touch_margin")? {
        if !(0.0..1.0).contains(&margin) {
            return Err(invalid(
                "pattern",
                "touch_margin",
                "touch_margin must be in [0, 1)",
            ));
        }
    }

    if let Some(band) = present(config, "pattern", "touch_band") {
        band.parse::<TouchBand>()
            .map_err(|e| invalid("pattern", "touch_band", e))?;
    }
    Ok(())
}

fn validate_throttle(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    if let Some(rate) = float_value(config, "throttle", "requests_per_second")? {
        if rate < 0.0 {
            return Err(invalid(
                "throttle",
                "requests_per_second",
                "requests_per_second must be non-negative",
            ));
        }
    }
    validate_positive(config, "throttle", "burst")?;
    validate_non_negative(config, "throttle", "max_retries")?;
    validate_non_negative(config, "throttle", "backoff_ms")?;
    Ok(())
}

fn validate_logging(config: &dyn ConfigPort) -> Result<(), ScreenerError> {
    if let Some(level) = present(config, "logging", "level") {
        if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            return Err(invalid(
                "logging",
                "level",
                format!("level must be one of {}", LOG_LEVELS.join(", ")),
            ));
        }
    }
    Ok(())
}
