//! Domain error types.

/// Top-level error type for gcscan.
#[derive(Debug, thiserror::Error)]
pub enum ScreenerError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown market: {0}")]
    UnknownMarket(String),

    #[error("retrieval failed for {code} on {market}: {reason}")]
    Retrieval {
        code: String,
        market: String,
        reason: String,
    },

    #[error("malformed series for {code}: {reason}")]
    DataIntegrity { code: String, reason: String },

    #[error("insufficient history for {code}: have {bars} bars, need {minimum}")]
    InsufficientHistory {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error("no data for {code} on {market}")]
    NoData { code: String, market: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScreenerError {
    /// True for errors that only affect a single instrument; the universe
    /// scan records them and moves on.
    pub fn is_per_instrument(&self) -> bool {
        matches!(
            self,
            ScreenerError::Retrieval { .. }
                | ScreenerError::DataIntegrity { .. }
                | ScreenerError::InsufficientHistory { .. }
                | ScreenerError::NoData { .. }
        )
    }
}

impl From<&ScreenerError> for std::process::ExitCode {
    fn from(err: &ScreenerError) -> Self {
        let code: u8 = match err {
            ScreenerError::Io(_) => 1,
            ScreenerError::ConfigParse { .. }
            | ScreenerError::ConfigMissing { .. }
            | ScreenerError::ConfigInvalid { .. }
            | ScreenerError::UnknownMarket(_) => 2,
            ScreenerError::Retrieval { .. } => 3,
            ScreenerError::DataIntegrity { .. } => 4,
            ScreenerError::NoData { .. } | ScreenerError::InsufficientHistory { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = ScreenerError::InsufficientHistory {
            code: "005930".into(),
            bars: 150,
            minimum: 201,
        };
        assert_eq!(
            err.to_string(),
            "insufficient history for 005930: have 150 bars, need 201"
        );
    }

    #[test]
    fn per_instrument_classification() {
        assert!(ScreenerError::Retrieval {
            code: "A".into(),
            market: "KOSPI".into(),
            reason: "timeout".into(),
        }
        .is_per_instrument());
        assert!(ScreenerError::DataIntegrity {
            code: "A".into(),
            reason: "duplicate date".into(),
        }
        .is_per_instrument());
        assert!(!ScreenerError::UnknownMarket("NASDAQ".into()).is_per_instrument());
        assert!(!ScreenerError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        }
        .is_per_instrument());
    }
}
