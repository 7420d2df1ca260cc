//! Domain error types.

/// Top-level error type for triggerscan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("import failed for {source_name}: {reason}")]
    Import { source_name: String, reason: String },

    #[error("failed to write report {path}: {reason}")]
    Report { path: String, reason: String },

    #[error("no securities available for analysis; import historical data first")]
    NoSecurities,

    #[error(
        "no dataset found for: {}{}",
        .unavailable.join(", "),
        insufficient_suffix(.insufficient)
    )]
    DataUnavailable {
        unavailable: Vec<String>,
        insufficient: Vec<String>,
    },

    #[error(
        "analysis produced no results; check the parameters and the selected period{}",
        insufficient_suffix(.insufficient)
    )]
    EmptyResult { insufficient: Vec<String> },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn insufficient_suffix(insufficient: &[String]) -> String {
    if insufficient.is_empty() {
        String::new()
    } else {
        format!(" (insufficient data: {})", insufficient.join(", "))
    }
}

impl ScanError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        ScanError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&ScanError> for std::process::ExitCode {
    fn from(err: &ScanError) -> Self {
        let code: u8 = match err {
            ScanError::Io(_) | ScanError::Report { .. } => 1,
            ScanError::ConfigParse { .. }
            | ScanError::ConfigMissing { .. }
            | ScanError::ConfigInvalid { .. } => 2,
            ScanError::Database { .. } | ScanError::DatabaseQuery { .. } => 3,
            ScanError::Import { .. } => 4,
            ScanError::NoSecurities
            | ScanError::DataUnavailable { .. }
            | ScanError::EmptyResult { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
