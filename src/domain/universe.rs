//! Security list parsing and per-security eligibility.
//!
//! A security takes part in a report only if the provider holds a dataset
//! for it with at least [`MIN_BARS`] bars in the requested range.

use crate::domain::bar::DailyBar;
use crate::ports::data_port::BarLookup;
use std::collections::HashSet;

/// One reference bar plus one evaluated bar.
pub const MIN_BARS: usize = 2;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in security list")]
    EmptyToken,

    #[error("duplicate security: {0}")]
    DuplicateCode(String),
}

/// Parses a comma-separated security list into uppercase codes.
///
/// Blank input yields an empty list, which means "every listed security".
pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

/// Removes repeated codes, keeping the first occurrence's position.
pub fn dedup_preserving_order(codes: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    codes
        .iter()
        .filter(|c| seen.insert(c.as_str()))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSecurity {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// No backing dataset, or the provider failed to read it.
    Unavailable,
    /// Dataset present but fewer than [`MIN_BARS`] bars in range.
    InsufficientBars { bars: usize },
}

impl SkipReason {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SkipReason::Unavailable)
    }
}

/// Accepts a lookup with enough bars for simulation.
pub fn eligible_bars(lookup: BarLookup) -> Result<Vec<DailyBar>, SkipReason> {
    match lookup {
        BarLookup::NotFound => Err(SkipReason::Unavailable),
        BarLookup::Empty => Err(SkipReason::InsufficientBars { bars: 0 }),
        BarLookup::Found(bars) if bars.len() < MIN_BARS => {
            Err(SkipReason::InsufficientBars { bars: bars.len() })
        }
        BarLookup::Found(bars) => Ok(bars),
    }
}
