//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::history_import::{import_files, ImportSummary};
use crate::domain::analysis::{AnalysisOutcome, Analyzer};
use crate::domain::config_validation::{
    parse_optional_date, parse_optional_number, validate_analysis_config, validate_data_config,
    validate_params,
};
use crate::domain::error::ScanError;
use crate::domain::metrics::{AnalysisResult, BatchSummary};
use crate::domain::params::{Direction, EntryReference, ExitReference, SimulationParams};
use crate::domain::universe::parse_codes;
use crate::logging;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{BarStore, DataPort};
use crate::ports::report_port::ReportPort;

pub const DEFAULT_REPORT_PATH: &str = "report.csv";

#[derive(Parser, Debug)]
#[command(
    name = "triggerscan",
    about = "Evaluates a percentage breakout rule over daily price history"
)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the trigger analysis and write the report
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        overrides: AnalysisOverrides,
        /// Validate configuration and print the plan without fetching data
        #[arg(long)]
        dry_run: bool,
    },
    /// List securities known to the data source
    ListSecurities {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show bar count and date range per security
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        security: Option<String>,
    },
    /// Import historical-data CSV exports into the data source
    Import {
        #[arg(short, long)]
        config: PathBuf,
        /// Export to import; repeat the flag or list several paths
        #[arg(short, long = "file", required = true, num_args = 1..)]
        files: Vec<PathBuf>,
        /// Security code for a single file; derived from the file name when omitted
        #[arg(long)]
        security: Option<String>,
    },
    /// Stop listing a security without deleting its bars
    Deactivate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        security: String,
        /// List the security again instead
        #[arg(long)]
        activate: bool,
    },
    /// Delete one security, or every stored security, from the data source
    Clear {
        #[arg(short, long)]
        config: PathBuf,
        /// Only remove this security
        #[arg(long)]
        security: Option<String>,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

/// Command-line values that take precedence over the config file.
#[derive(Args, Debug, Default, Clone)]
pub struct AnalysisOverrides {
    /// Comma-separated security codes
    #[arg(long)]
    pub securities: Option<String>,
    /// long or short
    #[arg(long)]
    pub direction: Option<String>,
    #[arg(long)]
    pub trigger_percent: Option<String>,
    #[arg(long)]
    pub min_volume: Option<String>,
    /// Entry reference (prev_close, prev_high, prev_low, prev_open, today_open)
    #[arg(long = "entry")]
    pub entry_reference: Option<String>,
    /// Exit reference (day_high, day_close)
    #[arg(long = "exit")]
    pub exit_reference: Option<String>,
    /// First date, YYYY-MM-DD
    #[arg(long = "start")]
    pub start_date: Option<String>,
    /// Last date, YYYY-MM-DD
    #[arg(long = "end")]
    pub end_date: Option<String>,
    /// Report output path
    #[arg(short, long)]
    pub output: Option<String>,
    /// Process securities one at a time
    #[arg(long)]
    pub sequential: bool,
}

/// Config view where command-line values shadow the file.
pub struct OverlayConfig<'a> {
    base: &'a dyn ConfigPort,
    overrides: HashMap<(String, String), String>,
}

impl<'a> OverlayConfig<'a> {
    pub fn new(base: &'a dyn ConfigPort, overrides: &AnalysisOverrides) -> Self {
        let mut map = HashMap::new();
        let entries = [
            ("analysis", "securities", &overrides.securities),
            ("analysis", "direction", &overrides.direction),
            ("analysis", "trigger_percent", &overrides.trigger_percent),
            ("analysis", "min_volume", &overrides.min_volume),
            ("analysis", "entry_reference", &overrides.entry_reference),
            ("analysis", "exit_reference", &overrides.exit_reference),
            ("analysis", "start_date", &overrides.start_date),
            ("analysis", "end_date", &overrides.end_date),
            ("report", "output", &overrides.output),
        ];
        for (section, key, value) in entries {
            if let Some(v) = value {
                map.insert((section.to_string(), key.to_string()), v.clone());
            }
        }
        if overrides.sequential {
            map.insert(
                ("analysis".to_string(), "parallel".to_string()),
                "false".to_string(),
            );
        }
        Self {
            base,
            overrides: map,
        }
    }

    fn lookup(&self, section: &str, key: &str) -> Option<&String> {
        self.overrides.get(&(section.to_string(), key.to_string()))
    }
}

impl ConfigPort for OverlayConfig<'_> {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.lookup(section, key)
            .cloned()
            .or_else(|| self.base.get_string(section, key))
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match self.lookup(section, key) {
            Some(v) => v.trim().parse().unwrap_or(default),
            None => self.base.get_int(section, key, default),
        }
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.lookup(section, key).map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "true" || v == "1" || v == "yes" => true,
            Some(v) if v == "false" || v == "0" || v == "no" => false,
            Some(_) => default,
            None => self.base.get_bool(section, key, default),
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let log_level = cli.log_level;
    let result = match cli.command {
        Command::Analyze {
            config,
            overrides,
            dry_run,
        } => run_analyze(&config, &overrides, dry_run, log_level.as_deref()),
        Command::ListSecurities { config } => run_list_securities(&config, log_level.as_deref()),
        Command::Info { config, security } => {
            run_info(&config, security.as_deref(), log_level.as_deref())
        }
        Command::Import {
            config,
            files,
            security,
        } => run_import(&config, &files, security.as_deref(), log_level.as_deref()),
        Command::Deactivate {
            config,
            security,
            activate,
        } => run_set_active(&config, &security, activate, log_level.as_deref()),
        Command::Clear {
            config,
            security,
            yes,
        } => run_clear(&config, security.as_deref(), yes, log_level.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ScanError> {
    FileConfigAdapter::from_file(path).map_err(|e| ScanError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn init_logging(cli_level: Option<&str>, config: &dyn ConfigPort) {
    let level = cli_level
        .map(str::to_string)
        .or_else(|| config.get_string("logging", "level"))
        .unwrap_or_else(|| logging::DEFAULT_LEVEL.to_string());
    logging::init(&level);
}

/// Builds typed simulation parameters from `[analysis]`.
///
/// Unset enum keys take the [`SimulationParams::default`] values;
/// `trigger_percent` is required.
pub fn build_params(config: &dyn ConfigPort) -> Result<SimulationParams, ScanError> {
    let defaults = SimulationParams::default();
    let text = |key: &str| {
        config
            .get_string("analysis", key)
            .filter(|v| !v.trim().is_empty())
    };

    let trigger_percent = parse_optional_number(
        text("trigger_percent").as_deref(),
        "analysis",
        "trigger_percent",
    )?
    .ok_or_else(|| ScanError::ConfigMissing {
        section: "analysis".into(),
        key: "trigger_percent".into(),
    })?;

    let direction = match text("direction") {
        Some(v) => v
            .parse::<Direction>()
            .map_err(|reason| ScanError::invalid("analysis", "direction", reason))?,
        None => defaults.direction,
    };
    let entry_reference = match text("entry_reference") {
        Some(v) => v
            .parse::<EntryReference>()
            .map_err(|reason| ScanError::invalid("analysis", "entry_reference", reason))?,
        None => defaults.entry_reference,
    };
    let exit_reference = match text("exit_reference") {
        Some(v) => v
            .parse::<ExitReference>()
            .map_err(|reason| ScanError::invalid("analysis", "exit_reference", reason))?,
        None => defaults.exit_reference,
    };

    let params = SimulationParams {
        direction,
        trigger_percent,
        min_volume: parse_optional_number(text("min_volume").as_deref(), "analysis", "min_volume")?,
        entry_reference,
        exit_reference,
        start_date: parse_optional_date(text("start_date").as_deref(), "analysis", "start_date")?,
        end_date: parse_optional_date(text("end_date").as_deref(), "analysis", "end_date")?,
    };

    validate_params(&params)?;
    Ok(params)
}

/// Requested security codes from `[analysis] securities`; empty means all.
pub fn resolve_requested(config: &dyn ConfigPort) -> Result<Vec<String>, ScanError> {
    let raw = config
        .get_string("analysis", "securities")
        .unwrap_or_default();
    parse_codes(&raw).map_err(|e| ScanError::invalid("analysis", "securities", e.to_string()))
}

pub fn report_path(config: &dyn ConfigPort) -> PathBuf {
    config
        .get_string("report", "output")
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_PATH))
}

/// The configured bar store, exposed as both provider and sink.
pub enum DataSource {
    Csv(CsvAdapter),
    #[cfg(feature = "sqlite")]
    Sqlite(crate::adapters::sqlite_adapter::SqliteAdapter),
}

impl DataSource {
    pub fn data_port(&self) -> &dyn DataPort {
        match self {
            DataSource::Csv(a) => a,
            #[cfg(feature = "sqlite")]
            DataSource::Sqlite(a) => a,
        }
    }

    pub fn bar_store(&self) -> &dyn BarStore {
        match self {
            DataSource::Csv(a) => a,
            #[cfg(feature = "sqlite")]
            DataSource::Sqlite(a) => a,
        }
    }
}

pub fn open_data_source(config: &dyn ConfigPort) -> Result<DataSource, ScanError> {
    validate_data_config(config)?;
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());

    match source.as_str() {
        "sqlite" => {
            #[cfg(feature = "sqlite")]
            {
                use crate::adapters::sqlite_adapter::SqliteAdapter;
                Ok(DataSource::Sqlite(SqliteAdapter::from_config(config)?))
            }
            #[cfg(not(feature = "sqlite"))]
            {
                Err(ScanError::invalid(
                    "data",
                    "source",
                    "sqlite support is not compiled in (enable the sqlite feature)",
                ))
            }
        }
        _ => {
            let path = config
                .get_string("data", "path")
                .ok_or_else(|| ScanError::ConfigMissing {
                    section: "data".into(),
                    key: "path".into(),
                })?;
            Ok(DataSource::Csv(CsvAdapter::new(PathBuf::from(path))))
        }
    }
}

fn run_analyze(
    config_path: &Path,
    overrides: &AnalysisOverrides,
    dry_run: bool,
    log_level: Option<&str>,
) -> Result<(), ScanError> {
    let file_config = load_config(config_path)?;
    init_logging(log_level, &file_config);
    info!(path = %config_path.display(), "config loaded");

    let config = OverlayConfig::new(&file_config, overrides);
    validate_data_config(&config)?;
    validate_analysis_config(&config)?;

    if dry_run {
        return run_dry_run(&config);
    }

    let source = open_data_source(&config)?;
    run_analysis_pipeline(source.data_port(), &config).map(|_| ())
}

/// Validates `config` and prints what an analysis run would do.
pub fn run_dry_run(config: &dyn ConfigPort) -> Result<(), ScanError> {
    let params = build_params(config)?;
    let requested = resolve_requested(config)?;

    eprintln!("Configuration validated successfully");
    eprintln!("\nParameters:");
    eprintln!("  direction:        {}", params.direction);
    eprintln!("  trigger_percent:  {}", params.trigger_percent);
    eprintln!("  entry_reference:  {}", params.entry_reference);
    eprintln!("  exit_reference:   {}", params.exit_reference);
    match params.min_volume {
        Some(v) => eprintln!("  min_volume:       {}", v),
        None => eprintln!("  min_volume:       (none)"),
    }
    eprintln!(
        "  period:           {} to {}",
        params
            .start_date
            .map_or_else(|| "start".to_string(), |d| d.to_string()),
        params
            .end_date
            .map_or_else(|| "end".to_string(), |d| d.to_string()),
    );
    if requested.is_empty() {
        eprintln!("  securities:       all listed");
    } else {
        eprintln!("  securities:       {}", requested.join(", "));
    }
    eprintln!("  report:           {}", report_path(config).display());

    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

/// Runs the analysis against `data_port`, prints the table and writes the
/// CSV report.
pub fn run_analysis_pipeline(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
) -> Result<AnalysisOutcome, ScanError> {
    let params = build_params(config)?;
    let requested = resolve_requested(config)?;
    let parallel = config.get_bool("analysis", "parallel", true);

    let outcome = Analyzer::new(data_port)
        .with_parallelism(parallel)
        .run_analysis(&requested, &params)?;

    println!("{}", format_results_table(&outcome.results));
    println!("{}", format_summary(&BatchSummary::from_results(&outcome.results)));

    if !outcome.skipped.is_empty() {
        let codes: Vec<&str> = outcome.skipped.iter().map(|s| s.code.as_str()).collect();
        eprintln!("Skipped: {}", codes.join(", "));
    }

    let output = report_path(config);
    CsvReportAdapter::new().write(&outcome.results, &params, &output.display().to_string())?;
    eprintln!("\nReport written to: {}", output.display());

    Ok(outcome)
}

pub fn format_results_table(results: &[AnalysisResult]) -> String {
    let mut out = format!(
        "{:<10} {:>5} {:>5} {:>7} {:>5} {:>7} {:>8} {:>8} {:>8} {:>8} {:>12} {:>10}",
        "Security", "Side", "Ops", "Gain%", "Loss", "Loss%", "MaxGain", "AvgGain",
        "MaxDD", "AvgDD", "AvgVolume", "Cumul%"
    );
    for r in results {
        out.push('\n');
        out.push_str(&format!(
            "{:<10} {:>5} {:>5} {:>7.2} {:>5} {:>7.2} {:>8.2} {:>8.2} {:>8.2} {:>8.2} {:>12.0} {:>10.2}",
            r.security_id,
            r.direction,
            r.total_operations,
            r.percent_gain,
            r.total_loss,
            r.percent_loss,
            r.max_gain,
            r.mean_gain,
            r.max_drawdown,
            r.mean_drawdown,
            r.mean_volume,
            r.cumulative_result,
        ));
    }
    out
}

pub fn format_summary(summary: &BatchSummary) -> String {
    let sign = if summary.cumulative_result >= 0.0 { "+" } else { "" };
    format!(
        "\n=== Summary ===\nSecurities:       {}\nTotal operations: {}\nWin rate:         {:.1}%\nCumulative:       {}{:.2}%",
        summary.securities, summary.total_operations, summary.win_rate, sign, summary.cumulative_result
    )
}

fn run_list_securities(config_path: &Path, log_level: Option<&str>) -> Result<(), ScanError> {
    let config = load_config(config_path)?;
    init_logging(log_level, &config);

    let source = open_data_source(&config)?;
    let securities = source.data_port().list_securities()?;

    if securities.is_empty() {
        eprintln!("No securities found");
    } else {
        for code in &securities {
            println!("{}", code);
        }
        eprintln!("{} securities found", securities.len());
    }
    Ok(())
}

fn run_info(
    config_path: &Path,
    security: Option<&str>,
    log_level: Option<&str>,
) -> Result<(), ScanError> {
    let config = load_config(config_path)?;
    init_logging(log_level, &config);

    let source = open_data_source(&config)?;
    let data_port = source.data_port();

    let codes = match security {
        Some(code) => vec![code.trim().to_uppercase()],
        None => {
            let requested = resolve_requested(&config)?;
            if requested.is_empty() {
                data_port.list_securities()?
            } else {
                requested
            }
        }
    };

    for code in &codes {
        match data_port.get_data_range(code) {
            Ok(Some((first, last, count))) => {
                println!("{}: {} bars, {} to {}", code, count, first, last);
            }
            Ok(None) => eprintln!("{}: no data found", code),
            Err(e) => eprintln!("error querying {}: {}", code, e),
        }
    }
    Ok(())
}

fn run_import(
    config_path: &Path,
    files: &[PathBuf],
    security: Option<&str>,
    log_level: Option<&str>,
) -> Result<(), ScanError> {
    if security.is_some() && files.len() > 1 {
        return Err(ScanError::Import {
            source_name: format!("{} files", files.len()),
            reason: "--security can only be used with a single file".into(),
        });
    }

    let config = load_config(config_path)?;
    init_logging(log_level, &config);

    let source = open_data_source(&config)?;
    let mut summary = import_files(files, security, source.bar_store());

    for report in &summary.imported {
        println!(
            "{}: {} bars imported ({} rows excluded, {} volume warnings)",
            report.code, report.stored, report.excluded_rows, report.volume_warnings
        );
    }
    for (path, e) in &summary.failed {
        eprintln!("failed: {}: {}", path.display(), e);
    }
    eprintln!("{}", format_import_summary(&summary));

    if !summary.imported.is_empty() {
        return Ok(());
    }
    match summary.failed.pop() {
        Some((_, e)) if summary.failed.is_empty() => Err(e),
        _ => Err(ScanError::Import {
            source_name: format!("{} files", files.len()),
            reason: "no file could be imported".into(),
        }),
    }
}

pub fn format_import_summary(summary: &ImportSummary) -> String {
    let codes = summary.codes();
    format!(
        "Import finished: {} of {} files imported, {} failed{}",
        summary.imported.len(),
        summary.total_files(),
        summary.failed.len(),
        if codes.is_empty() {
            String::new()
        } else {
            format!(" (securities: {})", codes.join(", "))
        }
    )
}

fn run_set_active(
    config_path: &Path,
    security: &str,
    active: bool,
    log_level: Option<&str>,
) -> Result<(), ScanError> {
    let config = load_config(config_path)?;
    init_logging(log_level, &config);

    let code = security.trim().to_uppercase();
    let source = open_data_source(&config)?;
    if !source.bar_store().set_active(&code, active)? {
        return Err(ScanError::DataUnavailable {
            unavailable: vec![code],
            insufficient: Vec::new(),
        });
    }

    info!(security = %code, active, "security status changed");
    let state = if active { "activated" } else { "deactivated" };
    eprintln!("{}: {}", code, state);
    Ok(())
}

fn run_clear(
    config_path: &Path,
    security: Option<&str>,
    confirmed: bool,
    log_level: Option<&str>,
) -> Result<(), ScanError> {
    let config = load_config(config_path)?;
    init_logging(log_level, &config);

    let code = security.map(|s| s.trim().to_uppercase());
    if !confirmed {
        let target = code.as_deref().unwrap_or("every stored security");
        eprintln!("Refusing to delete {} without --yes", target);
        return Err(ScanError::invalid(
            "clear",
            "yes",
            "deletion must be confirmed with --yes",
        ));
    }

    let source = open_data_source(&config)?;
    let store = source.bar_store();
    match code {
        Some(code) => {
            if !store.remove_security(&code)? {
                return Err(ScanError::DataUnavailable {
                    unavailable: vec![code],
                    insufficient: Vec::new(),
                });
            }
            info!(security = %code, "security removed");
            eprintln!("{}: removed", code);
        }
        None => {
            let removed = store.clear()?;
            info!(removed, "data source cleared");
            eprintln!("{} securities removed", removed);
        }
    }
    Ok(())
}
