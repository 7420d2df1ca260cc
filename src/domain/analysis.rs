//! Batch orchestration: resolve securities, simulate each, assemble the report.
//!
//! Every security is an independent map step (`fetch -> simulate ->
//! aggregate`). With parallelism enabled the map runs on the rayon pool; the
//! indexed collect keeps the report in the resolved security order either way.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::config_validation::validate_params;
use crate::domain::error::ScanError;
use crate::domain::metrics::AnalysisResult;
use crate::domain::params::SimulationParams;
use crate::domain::simulator::simulate;
use crate::domain::universe::{dedup_preserving_order, eligible_bars, SkipReason, SkippedSecurity};
use crate::ports::data_port::DataPort;

/// Report rows plus the securities that were left out.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub results: Vec<AnalysisResult>,
    pub skipped: Vec<SkippedSecurity>,
}

/// Runs trigger scans against an injected bar provider.
pub struct Analyzer<'a> {
    data_port: &'a dyn DataPort,
    parallel: bool,
}

impl<'a> Analyzer<'a> {
    pub fn new(data_port: &'a dyn DataPort) -> Self {
        Self {
            data_port,
            parallel: true,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// The requested codes in order, or every listed security when none are
    /// requested.
    pub fn resolve_securities(&self, requested: &[String]) -> Result<Vec<String>, ScanError> {
        let codes = if requested.is_empty() {
            self.data_port.list_securities()?
        } else {
            dedup_preserving_order(requested)
        };

        if codes.is_empty() {
            return Err(ScanError::NoSecurities);
        }
        Ok(codes)
    }

    /// Fetches, simulates and aggregates one security.
    pub fn analyze_security(
        &self,
        code: &str,
        params: &SimulationParams,
    ) -> Result<AnalysisResult, SkipReason> {
        let lookup = match self
            .data_port
            .fetch_bars(code, params.start_date, params.end_date)
        {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!(security = %code, error = %e, "failed to fetch bars");
                return Err(SkipReason::Unavailable);
            }
        };

        let bars = eligible_bars(lookup)?;
        let operations = simulate(&bars, params);
        debug!(
            security = %code,
            bars = bars.len(),
            operations = operations.len(),
            "security simulated"
        );

        Ok(AnalysisResult::from_operations(code, params.direction, &operations))
    }

    /// Analyses `requested` (or every listed security when empty).
    ///
    /// Parameters are validated before anything is fetched. Securities
    /// without a dataset or with fewer than two bars are skipped; the batch
    /// fails only when no security produced a row. Securities with zero
    /// triggers still produce a row.
    pub fn run_analysis(
        &self,
        requested: &[String],
        params: &SimulationParams,
    ) -> Result<AnalysisOutcome, ScanError> {
        validate_params(params)?;
        let codes = self.resolve_securities(requested)?;

        info!(
            securities = codes.len(),
            direction = %params.direction,
            trigger_percent = params.trigger_percent,
            parallel = self.parallel,
            "running analysis"
        );

        let analyze = |code: &String| {
            self.analyze_security(code, params)
                .map_err(|reason| SkippedSecurity {
                    code: code.clone(),
                    reason,
                })
        };

        let outcomes: Vec<Result<AnalysisResult, SkippedSecurity>> = if self.parallel {
            codes.par_iter().map(analyze).collect()
        } else {
            codes.iter().map(analyze).collect()
        };

        let mut results = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(skip) => {
                    match skip.reason {
                        SkipReason::Unavailable => {
                            warn!(security = %skip.code, "skipping security: no dataset")
                        }
                        SkipReason::InsufficientBars { bars } => {
                            warn!(security = %skip.code, bars, "skipping security: insufficient data")
                        }
                    }
                    skipped.push(skip);
                }
            }
        }

        if results.is_empty() {
            return Err(empty_report_error(&skipped));
        }

        if !skipped.is_empty() {
            info!(
                analysed = results.len(),
                requested = codes.len(),
                "some securities were skipped"
            );
        }

        Ok(AnalysisOutcome { results, skipped })
    }
}

fn empty_report_error(skipped: &[SkippedSecurity]) -> ScanError {
    let (unavailable, insufficient): (Vec<&SkippedSecurity>, Vec<&SkippedSecurity>) =
        skipped.iter().partition(|s| s.reason.is_unavailable());
    let unavailable: Vec<String> = unavailable.into_iter().map(|s| s.code.clone()).collect();
    let insufficient: Vec<String> = insufficient.into_iter().map(|s| s.code.clone()).collect();

    if unavailable.is_empty() {
        ScanError::EmptyResult { insufficient }
    } else {
        ScanError::DataUnavailable {
            unavailable,
            insufficient,
        }
    }
}
