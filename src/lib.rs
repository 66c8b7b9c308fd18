//! gcscan: golden-cross pullback equity screener.
//!
//! Hexagonal architecture: the signal-detection engine and screener live in
//! [`domain`], collaborator traits in [`ports`], concrete implementations in
//! [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
