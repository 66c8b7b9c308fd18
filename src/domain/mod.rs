//! Core domain types and logic.

pub mod ohlcv;
pub mod series;
pub mod indicator;
pub mod indicator_set;
pub mod crossover;
pub mod pullback;
pub mod volume_ratio;
pub mod scan;
pub mod scan_params;
pub mod session;
pub mod universe;
pub mod screener;
pub mod config_validation;
pub mod error;
