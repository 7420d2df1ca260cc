#![allow(dead_code)]

use chrono::NaiveDate;
pub use triggerscan::domain::bar::DailyBar;
use triggerscan::domain::error::ScanError;
use triggerscan::ports::data_port::{BarLookup, DataPort};
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<DailyBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<DailyBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn list_securities(&self) -> Result<Vec<String>, ScanError> {
        let mut codes: Vec<String> = self.data.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }

    fn fetch_bars(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<BarLookup, ScanError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(ScanError::Database {
                reason: reason.clone(),
            });
        }
        let Some(bars) = self.data.get(code) else {
            return Ok(BarLookup::NotFound);
        };
        let in_range = bars
            .iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s))
            .filter(|b| end_date.is_none_or(|e| b.date <= e))
            .cloned()
            .collect();
        Ok(BarLookup::from_bars(in_range))
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, ScanError> {
        Ok(self
            .data
            .get(code)
            .and_then(|bars| triggerscan::domain::bar::date_span(bars)))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn bar(day: u32, open: f64, high: f64, low: f64, close: f64, volume: f64) -> DailyBar {
    DailyBar::new(date(2024, 1, day), open, high, low, close, volume)
}

/// Four January 2024 sessions.
///
/// Long, prev_close, 2%: Jan 3 triggers at 104.04, Jan 4 misses (109.14 vs
/// high 108), Jan 5 triggers at 107.1.
pub fn petr4_bars() -> Vec<DailyBar> {
    vec![
        bar(2, 100.0, 105.0, 95.0, 102.0, 1000.0),
        bar(3, 102.0, 108.0, 101.0, 107.0, 2000.0),
        bar(4, 107.0, 108.0, 104.0, 105.0, 500.0),
        bar(5, 105.0, 112.0, 103.0, 110.0, 3000.0),
    ]
}

/// Steady drift with a daily range wide enough to trigger small percentages.
pub fn drifting_bars(days: u32, start: f64, step: f64) -> Vec<DailyBar> {
    (0..days)
        .map(|i| {
            let open = start + step * i as f64;
            let close = open + step;
            DailyBar::new(
                date(2024, 1, 1) + chrono::Days::new(i as u64),
                open,
                open.max(close) * 1.03,
                open.min(close) * 0.97,
                close,
                10_000.0 + i as f64 * 100.0,
            )
        })
        .collect()
}
