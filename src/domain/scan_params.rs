//! Tunable windows and margins for the golden-cross pullback scan.

use crate::domain::error::ScreenerError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Which pattern family a scan reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternTarget {
    /// Golden cross only.
    PriceCross,
    /// Short/medium volume-average ratio only.
    VolumeRatio,
    /// Golden cross → pullback → reversal signal.
    Pullback,
    /// Every stage; any populated sub-result counts.
    All,
}

impl PatternTarget {
    pub fn runs_crossover(self) -> bool {
        matches!(
            self,
            PatternTarget::PriceCross | PatternTarget::Pullback | PatternTarget::All
        )
    }

    pub fn runs_pullback(self) -> bool {
        matches!(self, PatternTarget::Pullback | PatternTarget::All)
    }

    pub fn runs_volume_ratio(self) -> bool {
        matches!(self, PatternTarget::VolumeRatio | PatternTarget::All)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PatternTarget::PriceCross => "price-cross",
            PatternTarget::VolumeRatio => "volume-ratio",
            PatternTarget::Pullback => "pullback",
            PatternTarget::All => "all",
        }
    }
}

impl fmt::Display for PatternTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "price-cross" | "price-gc" => Ok(PatternTarget::PriceCross),
            "volume-ratio" | "vol-gc" => Ok(PatternTarget::VolumeRatio),
            "pullback" => Ok(PatternTarget::Pullback),
            "all" => Ok(PatternTarget::All),
            other => Err(format!(
                "unknown target '{}' (expected price-cross, volume-ratio, pullback or all)",
                other
            )),
        }
    }
}

/// Shape of the tolerance band around the short moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TouchBand {
    /// `MA·(1−m) ≤ x ≤ MA·(1+m)`
    Symmetric,
    /// `x ≤ MA·(1+m)`; any dip below the average counts.
    UpperOnly,
}

impl TouchBand {
    pub fn contains(self, price: f64, ma: f64, margin: f64) -> bool {
        let upper = ma * (1.0 + margin);
        match self {
            TouchBand::Symmetric => ma * (1.0 - margin) <= price && price <= upper,
            TouchBand::UpperOnly => price <= upper,
        }
    }
}

impl FromStr for TouchBand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "symmetric" => Ok(TouchBand::Symmetric),
            "upper-only" | "upper" => Ok(TouchBand::UpperOnly),
            other => Err(format!(
                "unknown touch band '{}' (expected symmetric or upper-only)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanParams {
    /// W1: short price moving average window.
    pub price_ma_short: usize,
    /// W2: long price (and volume) moving average window.
    pub price_ma_long: usize,
    /// L: how many recent bars the crossover search covers.
    pub crossover_lookback: usize,
    /// Require `vol_ma_short > vol_ma_long` at the crossover bar.
    pub volume_gate: bool,
    pub pullback_min: usize,
    pub pullback_max: usize,
    pub touch_margin: f64,
    pub touch_band: TouchBand,
    pub signal_lookback: usize,
    /// V0
    pub volume_ma_ultra_short: usize,
    /// V1
    pub volume_ma_short: usize,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            price_ma_short: 20,
            price_ma_long: 200,
            crossover_lookback: 30,
            volume_gate: true,
            pullback_min: 3,
            pullback_max: 10,
            touch_margin: 0.02,
            touch_band: TouchBand::Symmetric,
            signal_lookback: 3,
            volume_ma_ultra_short: 5,
            volume_ma_short: 20,
        }
    }
}

impl ScanParams {
    /// Bars needed before the crossover and pullback stages run.
    pub fn min_history(&self) -> usize {
        self.price_ma_long + 1
    }

    /// Bars needed before the volume-ratio check can produce a value.
    pub fn min_volume_history(&self) -> usize {
        self.volume_ma_short.max(self.volume_ma_ultra_short)
    }

    /// Bars needed for `target` to have any chance of a hit.
    pub fn min_history_for(&self, target: PatternTarget) -> usize {
        match target {
            PatternTarget::VolumeRatio => self.min_volume_history(),
            PatternTarget::All => self.min_history().min(self.min_volume_history()),
            PatternTarget::PriceCross | PatternTarget::Pullback => self.min_history(),
        }
    }

    pub fn validate(&self) -> Result<(), ScreenerError> {
        let windows = [
            ("price_ma_short", self.price_ma_short),
            ("price_ma_long", self.price_ma_long),
            ("crossover_lookback", self.crossover_lookback),
            ("signal_lookback", self.signal_lookback),
            ("volume_ma_ultra_short", self.volume_ma_ultra_short),
            ("volume_ma_short", self.volume_ma_short),
        ];
        for (key, value) in windows {
            if value == 0 {
                return Err(invalid(key, "window must be positive"));
            }
        }

        if self.pullback_min > self.pullback_max {
            return Err(invalid(
                "pullback_min",
                "pullback_min must not exceed pullback_max",
            ));
        }

        if !self.touch_margin.is_finite() || self.touch_margin < 0.0 || self.touch_margin >= 1.0 {
            return Err(invalid(
                "touch_margin",
                "touch_margin must be in [0, 1)",
            ));
        }

        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> ScreenerError {
    ScreenerError::ConfigInvalid {
        section: "pattern".to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
