//! triggerscan: evaluates a fixed-percentage breakout rule against daily
//! OHLCV history and summarises the outcome per security.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod logging;
pub mod ports;
