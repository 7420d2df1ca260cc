//! CSV directory data adapter.
//!
//! One file per security, `<CODE>.csv`, with the header
//! `date,open,high,low,close,volume` and ISO dates. CSV files with any other
//! header (a report written into the directory, say) are not securities.
//! Deactivated codes are kept one per line in `.inactive`.

use crate::domain::bar::{date_span, DailyBar};
use crate::domain::error::ScanError;
use crate::ports::data_port::{BarLookup, BarStore, DataPort};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const HEADER: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];
const INACTIVE_FILE: &str = ".inactive";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }

    /// Every bar in the file, sorted by date; `None` when the file is absent.
    fn read_all(&self, code: &str) -> Result<Option<Vec<DailyBar>>, ScanError> {
        let path = self.csv_path(code);
        if !path.exists() {
            return Ok(None);
        }
        read_bars(&path).map(Some)
    }

    fn inactive_path(&self) -> PathBuf {
        self.base_path.join(INACTIVE_FILE)
    }

    fn read_inactive(&self) -> Result<BTreeSet<String>, ScanError> {
        let path = self.inactive_path();
        if !path.exists() {
            return Ok(BTreeSet::new());
        }
        let content = fs::read_to_string(&path)?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    fn write_inactive(&self, inactive: &BTreeSet<String>) -> Result<(), ScanError> {
        let path = self.inactive_path();
        if inactive.is_empty() {
            if path.exists() {
                fs::remove_file(&path)?;
            }
            return Ok(());
        }
        let mut content = String::new();
        for code in inactive {
            content.push_str(code);
            content.push('\n');
        }
        fs::write(&path, content)?;
        Ok(())
    }

    /// Codes of every bar file in the directory, active or not.
    fn stored_codes(&self) -> Result<Vec<String>, ScanError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            db_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut codes = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| db_error(format!("directory entry error: {}", e)))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if has_bar_header(&path) {
                codes.push(stem.to_string());
            } else {
                debug!(path = %path.display(), "skipping csv without bar header");
            }
        }

        codes.sort();
        Ok(codes)
    }
}

fn has_bar_header(path: &Path) -> bool {
    let Ok(mut rdr) = csv::Reader::from_path(path) else {
        return false;
    };
    match rdr.headers() {
        Ok(headers) => headers.iter().map(str::trim).eq(HEADER),
        Err(_) => false,
    }
}

fn db_error(reason: String) -> ScanError {
    ScanError::Database { reason }
}

fn parse_number(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, ScanError> {
    record
        .get(index)
        .ok_or_else(|| db_error(format!("missing {} column", name)))?
        .trim()
        .parse()
        .map_err(|e| db_error(format!("invalid {} value: {}", name, e)))
}

fn read_bars(path: &Path) -> Result<Vec<DailyBar>, ScanError> {
    let mut rdr = csv::Reader::from_path(path)
        .map_err(|e| db_error(format!("failed to read {}: {}", path.display(), e)))?;
    let mut bars = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| db_error(format!("CSV parse error: {}", e)))?;

        let date_str = record
            .get(0)
            .ok_or_else(|| db_error("missing date column".into()))?;
        let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
            .map_err(|e| db_error(format!("invalid date format: {}", e)))?;

        bars.push(DailyBar {
            date,
            open: parse_number(&record, 1, "open")?,
            high: parse_number(&record, 2, "high")?,
            low: parse_number(&record, 3, "low")?,
            close: parse_number(&record, 4, "close")?,
            volume: parse_number(&record, 5, "volume")?,
        });
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

fn write_bars(path: &Path, bars: &[DailyBar]) -> Result<(), ScanError> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| db_error(format!("failed to create {}: {}", path.display(), e)))?;
    wtr.write_record(HEADER)
        .map_err(|e| db_error(format!("CSV write error: {}", e)))?;
    for bar in bars {
        wtr.write_record([
            bar.date.format("%Y-%m-%d").to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])
        .map_err(|e| db_error(format!("CSV write error: {}", e)))?;
    }
    wtr.flush()?;
    Ok(())
}

impl DataPort for CsvAdapter {
    fn list_securities(&self) -> Result<Vec<String>, ScanError> {
        let inactive = self.read_inactive()?;
        let mut codes = self.stored_codes()?;
        codes.retain(|c| !inactive.contains(c));
        Ok(codes)
    }

    fn fetch_bars(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<BarLookup, ScanError> {
        let Some(bars) = self.read_all(code)? else {
            return Ok(BarLookup::NotFound);
        };

        let in_range = bars
            .into_iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s))
            .filter(|b| end_date.is_none_or(|e| b.date <= e))
            .collect();

        Ok(BarLookup::from_bars(in_range))
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, ScanError> {
        Ok(self.read_all(code)?.and_then(|bars| date_span(&bars)))
    }
}

impl BarStore for CsvAdapter {
    fn store_bars(&self, code: &str, bars: &[DailyBar]) -> Result<usize, ScanError> {
        fs::create_dir_all(&self.base_path)?;

        let mut merged: BTreeMap<NaiveDate, DailyBar> = self
            .read_all(code)?
            .unwrap_or_default()
            .into_iter()
            .map(|b| (b.date, b))
            .collect();
        for bar in bars {
            merged.insert(bar.date, bar.clone());
        }

        let merged: Vec<DailyBar> = merged.into_values().collect();
        write_bars(&self.csv_path(code), &merged)?;

        let mut inactive = self.read_inactive()?;
        if inactive.remove(code) {
            self.write_inactive(&inactive)?;
        }
        Ok(bars.len())
    }

    fn set_active(&self, code: &str, active: bool) -> Result<bool, ScanError> {
        if !self.csv_path(code).exists() {
            return Ok(false);
        }
        let mut inactive = self.read_inactive()?;
        let changed = if active {
            inactive.remove(code)
        } else {
            inactive.insert(code.to_string())
        };
        if changed {
            self.write_inactive(&inactive)?;
        }
        Ok(true)
    }

    fn remove_security(&self, code: &str) -> Result<bool, ScanError> {
        let path = self.csv_path(code);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;

        let mut inactive = self.read_inactive()?;
        if inactive.remove(code) {
            self.write_inactive(&inactive)?;
        }
        Ok(true)
    }

    fn clear(&self) -> Result<usize, ScanError> {
        if !self.base_path.exists() {
            return Ok(0);
        }
        let codes = self.stored_codes()?;
        for code in &codes {
            fs::remove_file(self.csv_path(code))?;
        }
        self.write_inactive(&BTreeSet::new())?;
        Ok(codes.len())
    }
}
