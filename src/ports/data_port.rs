//! Data access port traits.

use crate::domain::bar::DailyBar;
use crate::domain::error::ScanError;
use chrono::NaiveDate;

/// Outcome of a bar lookup for one security.
///
/// Keeps "no dataset for this security" apart from "dataset exists but has
/// no bars in the requested range".
#[derive(Debug, Clone, PartialEq)]
pub enum BarLookup {
    /// Bars in ascending date order; never empty.
    Found(Vec<DailyBar>),
    /// The provider has no dataset for the security.
    NotFound,
    /// The dataset exists but holds no bars in the requested range.
    Empty,
}

impl BarLookup {
    /// Wraps fetched bars, mapping an empty vector to [`BarLookup::Empty`].
    pub fn from_bars(bars: Vec<DailyBar>) -> Self {
        if bars.is_empty() {
            BarLookup::Empty
        } else {
            BarLookup::Found(bars)
        }
    }

    pub fn bar_count(&self) -> usize {
        match self {
            BarLookup::Found(bars) => bars.len(),
            BarLookup::NotFound | BarLookup::Empty => 0,
        }
    }
}

/// Bar provider consumed by the analysis.
pub trait DataPort: Send + Sync {
    /// Securities currently available, in a deterministic order.
    fn list_securities(&self) -> Result<Vec<String>, ScanError>;

    /// Daily bars for `code`, optionally bounded (inclusive) by date.
    fn fetch_bars(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<BarLookup, ScanError>;

    /// First date, last date and bar count held for `code`.
    fn get_data_range(&self, code: &str)
    -> Result<Option<(NaiveDate, NaiveDate, usize)>, ScanError>;
}

/// Write side of a bar store, used by history import and store maintenance.
pub trait BarStore {
    /// Upserts `bars` for `code` by date and marks the security as available.
    /// Returns the number of bars written.
    fn store_bars(&self, code: &str, bars: &[DailyBar]) -> Result<usize, ScanError>;

    /// Lists or unlists a stored security without touching its bars.
    /// Returns `false` when the store holds nothing for `code`.
    fn set_active(&self, code: &str, active: bool) -> Result<bool, ScanError>;

    /// Drops a security and all its bars. Returns `false` when it was unknown.
    fn remove_security(&self, code: &str) -> Result<bool, ScanError>;

    /// Drops every security. Returns how many were removed.
    fn clear(&self) -> Result<usize, ScanError>;
}
