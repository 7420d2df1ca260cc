//! Configuration validation.
//!
//! Validates every analysis field before any bar is fetched, so a bad
//! request is rejected as a whole.

use crate::domain::error::ScanError;
use crate::domain::params::{Direction, EntryReference, ExitReference, SimulationParams};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_analysis_config(config: &dyn ConfigPort) -> Result<(), ScanError> {
    validate_trigger_percent(config)?;
    validate_min_volume(config)?;
    validate_enum::<Direction>(config, "direction")?;
    validate_enum::<EntryReference>(config, "entry_reference")?;
    validate_enum::<ExitReference>(config, "exit_reference")?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), ScanError> {
    match config.get_string("data", "source").as_deref() {
        None | Some("csv") | Some("sqlite") => {}
        Some(other) => {
            return Err(ScanError::invalid(
                "data",
                "source",
                format!("unknown source '{other}' (expected csv or sqlite)"),
            ));
        }
    }
    if config.get_string("data", "path").is_none() {
        return Err(ScanError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        });
    }
    Ok(())
}

/// Range checks on already-typed parameters.
pub fn validate_params(params: &SimulationParams) -> Result<(), ScanError> {
    let p = params.trigger_percent;
    if !p.is_finite() || p < 0.0 {
        return Err(ScanError::invalid(
            "analysis",
            "trigger_percent",
            "trigger_percent must be a non-negative number",
        ));
    }
    if params.direction == Direction::Short && p >= 100.0 {
        return Err(ScanError::invalid(
            "analysis",
            "trigger_percent",
            "trigger_percent must be below 100 for short analysis",
        ));
    }

    if let Some(min_volume) = params.min_volume {
        if !min_volume.is_finite() || min_volume < 0.0 {
            return Err(ScanError::invalid(
                "analysis",
                "min_volume",
                "min_volume must be a non-negative number",
            ));
        }
    }

    if let (Some(start), Some(end)) = (params.start_date, params.end_date) {
        if start > end {
            return Err(ScanError::invalid(
                "analysis",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }

    Ok(())
}

/// Parses an optional `YYYY-MM-DD` value; blank counts as unset.
pub fn parse_optional_date(
    value: Option<&str>,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, ScanError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, DATE_FORMAT)
            .map(Some)
            .map_err(|_| {
                ScanError::invalid(section, key, "invalid date format (expected YYYY-MM-DD)")
            }),
    }
}

/// Parses an optional float; blank counts as unset.
pub fn parse_optional_number(
    value: Option<&str>,
    section: &str,
    key: &str,
) -> Result<Option<f64>, ScanError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ScanError::invalid(section, key, format!("'{v}' is not a number"))),
    }
}

fn validate_trigger_percent(config: &dyn ConfigPort) -> Result<(), ScanError> {
    let value = config.get_string("analysis", "trigger_percent");
    match parse_optional_number(value.as_deref(), "analysis", "trigger_percent")? {
        None => Err(ScanError::ConfigMissing {
            section: "analysis".to_string(),
            key: "trigger_percent".to_string(),
        }),
        Some(p) if !p.is_finite() || p < 0.0 => Err(ScanError::invalid(
            "analysis",
            "trigger_percent",
            "trigger_percent must be a non-negative number",
        )),
        Some(_) => Ok(()),
    }
}

fn validate_min_volume(config: &dyn ConfigPort) -> Result<(), ScanError> {
    let value = config.get_string("analysis", "min_volume");
    match parse_optional_number(value.as_deref(), "analysis", "min_volume")? {
        Some(v) if !v.is_finite() || v < 0.0 => Err(ScanError::invalid(
            "analysis",
            "min_volume",
            "min_volume must be a non-negative number",
        )),
        _ => Ok(()),
    }
}

fn validate_enum<T>(config: &dyn ConfigPort, key: &str) -> Result<(), ScanError>
where
    T: std::str::FromStr<Err = String>,
{
    match config.get_string("analysis", key) {
        Some(value) if !value.trim().is_empty() => value
            .parse::<T>()
            .map(|_| ())
            .map_err(|reason| ScanError::invalid("analysis", key, reason)),
        _ => Ok(()),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), ScanError> {
    let start = config.get_string("analysis", "start_date");
    let end = config.get_string("analysis", "end_date");
    let start = parse_optional_date(start.as_deref(), "analysis", "start_date")?;
    let end = parse_optional_date(end.as_deref(), "analysis", "end_date")?;

    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(ScanError::invalid(
                "analysis",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }
    Ok(())
}
