//! Core domain types and logic.

pub mod analysis;
pub mod bar;
pub mod config_validation;
pub mod error;
pub mod metrics;
pub mod params;
pub mod simulator;
pub mod trigger;
pub mod universe;
