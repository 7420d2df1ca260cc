//! Import of exchange "historical data" CSV exports.
//!
//! Accepts the column names used by Portuguese and English exports
//! (`Data`/`Date`, `Último`/`Price`, `Abertura`/`Open`, ...), comma decimal
//! separators and abbreviated volumes such as `21,83M`.

use crate::domain::bar::DailyBar;
use crate::domain::error::ScanError;
use crate::ports::data_port::BarStore;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DATE_COLUMNS: &[&str] = &["data", "date"];
const CLOSE_COLUMNS: &[&str] = &["último", "ultimo", "price", "close", "fechamento"];
const OPEN_COLUMNS: &[&str] = &["abertura", "open"];
const HIGH_COLUMNS: &[&str] = &["máxima", "maxima", "high"];
const LOW_COLUMNS: &[&str] = &["mínima", "minima", "low"];
const VOLUME_COLUMNS: &[&str] = &["vol.", "vol", "volume"];

/// Bars recovered from one export, plus row-level bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedHistory {
    /// Ascending by date, one bar per date.
    pub bars: Vec<DailyBar>,
    /// Rows dropped because a required cell was blank.
    pub excluded_rows: usize,
    /// Rows whose volume was unreadable and stored as zero.
    pub volume_warnings: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub code: String,
    pub stored: usize,
    pub excluded_rows: usize,
    pub volume_warnings: usize,
}

/// Derives a security code from an export's file name.
///
/// A leading ticker of four letters and a number (`BBAS3 Dados
/// Históricos.csv`, `PETR4_Historico.csv`, `MGLU3.SA.csv`) wins; otherwise the
/// uppercase alphanumerics of the stem, at most six characters.
pub fn security_code_from_filename(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);
    let stem = strip_csv_extension(stem);

    let chars: Vec<char> = stem.chars().collect();
    let letters = chars.iter().take(4).filter(|c| c.is_ascii_alphabetic()).count();
    if letters == 4 {
        let digits: String = chars[4..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if !digits.is_empty() {
            let prefix: String = chars[..4].iter().collect();
            return format!("{}{}", prefix, digits).to_uppercase();
        }
    }

    stem.to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(6)
        .collect()
}

fn strip_csv_extension(name: &str) -> &str {
    match name.len().checked_sub(4).and_then(|at| name.get(at..).map(|ext| (at, ext))) {
        Some((at, ext)) if ext.eq_ignore_ascii_case(".csv") => &name[..at],
        _ => name,
    }
}

/// Parses a price cell, accepting `38,50` and `1.234,56`.
pub fn parse_price(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let normalized = if s.contains(',') && s.contains('.') {
        s.replace('.', "").replace(',', ".")
    } else {
        s.replace(',', ".")
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a volume cell. Blank means zero; `K`, `M` and `B` suffixes scale.
pub fn parse_volume(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return Some(0.0);
    }

    let (number, multiplier) = match s.chars().last().map(|c| c.to_ascii_uppercase()) {
        Some('K') => (&s[..s.len() - 1], 1e3),
        Some('M') => (&s[..s.len() - 1], 1e6),
        Some('B') => (&s[..s.len() - 1], 1e9),
        _ => (s, 1.0),
    };

    parse_price(number)
        .filter(|v| *v >= 0.0)
        .map(|v| v * multiplier)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    NaiveDate::parse_from_str(s, "%d.%m.%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| names.contains(&h.as_str()))
}

fn import_error(source_name: &str, reason: impl Into<String>) -> ScanError {
    ScanError::Import {
        source_name: source_name.to_string(),
        reason: reason.into(),
    }
}

/// Parses an export into date-ordered bars.
///
/// Structural problems (empty file, missing required column) and malformed
/// dates or prices reject the whole file. Rows with a blank required cell are
/// dropped and counted.
pub fn parse_history<R: Read>(reader: R, source_name: &str) -> Result<ParsedHistory, ScanError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| import_error(source_name, format!("unreadable header: {}", e)))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();

    let required = [
        ("Data", DATE_COLUMNS),
        ("Último", CLOSE_COLUMNS),
        ("Abertura", OPEN_COLUMNS),
        ("Máxima", HIGH_COLUMNS),
        ("Mínima", LOW_COLUMNS),
    ];
    let mut indices = [0usize; 5];
    for (slot, (label, names)) in required.iter().enumerate() {
        indices[slot] = find_column(&headers, names).ok_or_else(|| {
            import_error(source_name, format!("required column '{}' not found", label))
        })?;
    }
    let [date_idx, close_idx, open_idx, high_idx, low_idx] = indices;
    let volume_idx = find_column(&headers, VOLUME_COLUMNS);

    let mut by_date: BTreeMap<NaiveDate, DailyBar> = BTreeMap::new();
    let mut rows = 0usize;
    let mut excluded_rows = 0usize;
    let mut volume_warnings = 0usize;

    for (i, result) in rdr.records().enumerate() {
        let line = i + 2;
        let record = result.map_err(|e| import_error(source_name, format!("line {}: {}", line, e)))?;
        rows += 1;

        let cell = |idx: usize| record.get(idx).unwrap_or("").trim();
        if indices.iter().any(|&idx| cell(idx).is_empty()) {
            excluded_rows += 1;
            continue;
        }

        let date = parse_date(cell(date_idx)).ok_or_else(|| {
            import_error(
                source_name,
                format!("invalid date on line {}: {} (expected DD.MM.YYYY)", line, cell(date_idx)),
            )
        })?;

        let price = |idx: usize, label: &str| {
            parse_price(cell(idx)).ok_or_else(|| {
                import_error(
                    source_name,
                    format!("invalid number for '{}' on line {}: {}", label, line, cell(idx)),
                )
            })
        };

        let close = price(close_idx, "Último")?;
        let open = price(open_idx, "Abertura")?;
        let high = price(high_idx, "Máxima")?;
        let low = price(low_idx, "Mínima")?;

        let volume = match volume_idx.map(cell) {
            None => 0.0,
            Some(raw) => parse_volume(raw).unwrap_or_else(|| {
                warn!(source = source_name, line, value = raw, "invalid volume, storing 0");
                volume_warnings += 1;
                0.0
            }),
        };

        by_date.insert(date, DailyBar::new(date, open, high, low, close, volume));
    }

    if rows == 0 {
        return Err(import_error(source_name, "file is empty"));
    }
    if by_date.is_empty() {
        return Err(import_error(source_name, "no valid rows found"));
    }

    Ok(ParsedHistory {
        bars: by_date.into_values().collect(),
        excluded_rows,
        volume_warnings,
    })
}

/// Parses `path` and stores its bars under `code` (or a code derived from
/// the file name).
pub fn import_file(
    path: &Path,
    code: Option<&str>,
    store: &dyn BarStore,
) -> Result<ImportReport, ScanError> {
    let source_name = path.display().to_string();
    let code = match code {
        Some(c) => c.trim().to_uppercase(),
        None => security_code_from_filename(&source_name),
    };
    if code.is_empty() {
        return Err(import_error(&source_name, "could not derive a security code"));
    }

    let file = File::open(path)
        .map_err(|e| import_error(&source_name, format!("cannot open file: {}", e)))?;
    let parsed = parse_history(file, &source_name)?;
    let stored = store.store_bars(&code, &parsed.bars)?;

    info!(
        security = %code,
        stored,
        excluded_rows = parsed.excluded_rows,
        volume_warnings = parsed.volume_warnings,
        "history imported"
    );

    Ok(ImportReport {
        code,
        stored,
        excluded_rows: parsed.excluded_rows,
        volume_warnings: parsed.volume_warnings,
    })
}

/// Outcome of a batch import: one entry per file, in input order.
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub imported: Vec<ImportReport>,
    pub failed: Vec<(PathBuf, ScanError)>,
}

impl ImportSummary {
    pub fn total_files(&self) -> usize {
        self.imported.len() + self.failed.len()
    }

    /// Distinct codes imported, in first-seen order.
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = Vec::new();
        for report in &self.imported {
            if !codes.contains(&report.code.as_str()) {
                codes.push(&report.code);
            }
        }
        codes
    }
}

/// Imports `paths` one after another. A file that fails is logged and
/// recorded; the rest of the batch still runs.
pub fn import_files(
    paths: &[PathBuf],
    code: Option<&str>,
    store: &dyn BarStore,
) -> ImportSummary {
    let mut summary = ImportSummary::default();
    for (i, path) in paths.iter().enumerate() {
        info!(file = %path.display(), index = i + 1, total = paths.len(), "importing");
        match import_file(path, code, store) {
            Ok(report) => summary.imported.push(report),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "import failed, continuing");
                summary.failed.push((path.clone(), e));
            }
        }
    }
    summary
}
