//! CSV report writer: one row per analysed security.

use crate::domain::error::ScanError;
use crate::domain::metrics::AnalysisResult;
use crate::domain::params::SimulationParams;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::Path;
use tracing::info;

pub const REPORT_HEADER: [&str; 13] = [
    "security",
    "direction",
    "total_operations",
    "total_gain",
    "percent_gain",
    "total_loss",
    "percent_loss",
    "max_gain",
    "mean_gain",
    "max_drawdown",
    "mean_drawdown",
    "mean_volume",
    "cumulative_result",
];

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn pct(value: f64) -> String {
    format!("{:.2}", value)
}

/// Formats one result as report cells, in [`REPORT_HEADER`] order.
pub fn report_row(result: &AnalysisResult) -> [String; 13] {
    [
        result.security_id.clone(),
        result.direction.to_string(),
        result.total_operations.to_string(),
        result.total_gain.to_string(),
        pct(result.percent_gain),
        result.total_loss.to_string(),
        pct(result.percent_loss),
        pct(result.max_gain),
        pct(result.mean_gain),
        pct(result.max_drawdown),
        pct(result.mean_drawdown),
        format!("{:.0}", result.mean_volume),
        pct(result.cumulative_result),
    ]
}

fn write_error(output_path: &str, e: csv::Error) -> ScanError {
    let reason = e.to_string();
    match e.into_kind() {
        csv::ErrorKind::Io(io) => ScanError::Io(io),
        _ => ScanError::Report {
            path: output_path.to_string(),
            reason,
        },
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        results: &[AnalysisResult],
        params: &SimulationParams,
        output_path: &str,
    ) -> Result<(), ScanError> {
        let path = Path::new(output_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut wtr = csv::Writer::from_path(path).map_err(|e| write_error(output_path, e))?;
        wtr.write_record(REPORT_HEADER)
            .map_err(|e| write_error(output_path, e))?;
        for result in results {
            wtr.write_record(report_row(result))
                .map_err(|e| write_error(output_path, e))?;
        }
        wtr.flush()?;

        info!(
            path = output_path,
            rows = results.len(),
            direction = %params.direction,
            trigger_percent = params.trigger_percent,
            "report written"
        );
        Ok(())
    }
}
