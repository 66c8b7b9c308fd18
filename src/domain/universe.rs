//! Scan universe: market listings ranked by market cap.
//!
//! Listings come from the data port unranked. They are ordered by market
//! cap (largest first, ties by code), numbered from 1 and cut to the top N.
//! An explicit code list from configuration narrows the universe further.

use crate::domain::error::ScreenerError;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub code: String,
    pub name: String,
    /// 0 when the source does not know it.
    pub market_cap: u64,
    /// 1-based position after ranking; 0 until ranked.
    pub rank: usize,
}

impl Listing {
    pub fn new(code: impl Into<String>, name: impl Into<String>, market_cap: u64) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            market_cap,
            rank: 0,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

impl From<UniverseError> for ScreenerError {
    fn from(err: UniverseError) -> Self {
        ScreenerError::ConfigInvalid {
            section: "universe".to_string(),
            key: "codes".to_string(),
            reason: err.to_string(),
        }
    }
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if seen.contains(&code) {
            return Err(UniverseError::DuplicateCode(code));
        }
        seen.insert(code.clone());
        codes.push(code);
    }

    Ok(codes)
}

/// Sort by market cap descending (ties by code) and assign ranks from 1.
pub fn rank_listings(mut listings: Vec<Listing>) -> Vec<Listing> {
    listings.sort_by(|a, b| {
        b.market_cap
            .cmp(&a.market_cap)
            .then_with(|| a.code.cmp(&b.code))
    });
    for (i, listing) in listings.iter_mut().enumerate() {
        listing.rank = i + 1;
    }
    listings
}

/// Rank `listings`, optionally restricted to `codes`, and keep the first
/// `top_n` (0 keeps everything).
///
/// With `include_unlisted`, a requested code missing from the listings is
/// still scanned, ranked as an unknown-cap instrument. Otherwise it belongs
/// to some other market and is left out.
pub fn select_universe(
    listings: Vec<Listing>,
    top_n: usize,
    codes: Option<&[String]>,
    include_unlisted: bool,
) -> Vec<Listing> {
    let listings = match codes {
        None => listings,
        Some(codes) => {
            let wanted: HashSet<&str> = codes.iter().map(String::as_str).collect();
            let mut kept: Vec<Listing> = listings
                .into_iter()
                .filter(|l| wanted.contains(l.code.as_str()))
                .collect();
            let present: HashSet<String> = kept.iter().map(|l| l.code.clone()).collect();
            for code in codes.iter().filter(|c| !present.contains(*c)) {
                if include_unlisted {
                    tracing::warn!(code = %code, "code not in market listing, scanning anyway");
                    kept.push(Listing::new(code.clone(), "", 0));
                } else {
                    tracing::debug!(code = %code, "code not in market listing");
                }
            }
            kept
        }
    };

    let mut ranked = rank_listings(listings);
    if top_n > 0 {
        ranked.truncate(top_n);
    }
    ranked
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

/// Why an instrument produced no scan outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    NoData,
    InsufficientHistory { bars: usize, minimum: usize },
    DataIntegrity { reason: String },
    Retrieval { reason: String },
}

impl SkipReason {
    /// Skip reason for a per-instrument error; `None` for run-level errors.
    pub fn from_error(err: &ScreenerError) -> Option<Self> {
        match err {
            ScreenerError::NoData { .. } => Some(SkipReason::NoData),
            ScreenerError::InsufficientHistory { bars, minimum, .. } => {
                Some(SkipReason::InsufficientHistory {
                    bars: *bars,
                    minimum: *minimum,
                })
            }
            ScreenerError::DataIntegrity { reason, .. } => Some(SkipReason::DataIntegrity {
                reason: reason.clone(),
            }),
            ScreenerError::Retrieval { reason, .. } => Some(SkipReason::Retrieval {
                reason: reason.clone(),
            }),
            _ => None,
        }
    }

    /// Failures are retrieval or integrity problems, as opposed to
    /// instruments that simply lack data.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SkipReason::DataIntegrity { .. } | SkipReason::Retrieval { .. }
        )
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoData => write!(f, "no data"),
            SkipReason::InsufficientHistory { bars, minimum } => {
                write!(f, "only {} bars, minimum {} required", bars, minimum)
            }
            SkipReason::DataIntegrity { reason } => write!(f, "malformed series: {}", reason),
            SkipReason::Retrieval { reason } => write!(f, "retrieval failed: {}", reason),
        }
    }
}
