//! Report generation port trait.

use crate::domain::error::ScanError;
use crate::domain::metrics::AnalysisResult;
use crate::domain::params::SimulationParams;

/// Port for writing analysis reports.
pub trait ReportPort {
    fn write(
        &self,
        results: &[AnalysisResult],
        params: &SimulationParams,
        output_path: &str,
    ) -> Result<(), ScanError>;
}
