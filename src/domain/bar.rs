//! Daily OHLCV bar representation.

use chrono::NaiveDate;

/// One trading day for a single security.
///
/// Bars are expected in ascending date order per security. No cross-field
/// invariant is enforced: a malformed bar with `high < close` is accepted
/// as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl DailyBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// First date, last date and bar count of a sequence, or `None` when empty.
pub fn date_span(bars: &[DailyBar]) -> Option<(NaiveDate, NaiveDate, usize)> {
    let first = bars.iter().map(|b| b.date).min()?;
    let last = bars.iter().map(|b| b.date).max()?;
    Some((first, last, bars.len()))
}
