//! Per-security statistics over simulated operations.

use super::params::Direction;
use super::simulator::Operation;

/// Summary row for one security. Built once, never mutated.
///
/// All percentage fields are in percent units (5.0 means 5%).
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub security_id: String,
    pub direction: Direction,
    pub total_operations: usize,
    pub total_gain: usize,
    pub percent_gain: f64,
    pub total_loss: usize,
    pub percent_loss: f64,
    pub max_gain: f64,
    pub mean_gain: f64,
    pub max_drawdown: f64,
    pub mean_drawdown: f64,
    pub mean_volume: f64,
    pub cumulative_result: f64,
}

impl AnalysisResult {
    /// Reduces an operation list into a summary row.
    ///
    /// Results of exactly zero count as losses. `cumulative_result` is the
    /// plain sum of operation results; returns are never compounded.
    pub fn from_operations(
        security_id: impl Into<String>,
        direction: Direction,
        operations: &[Operation],
    ) -> Self {
        let security_id = security_id.into();
        let total_operations = operations.len();

        if total_operations == 0 {
            return Self::empty(security_id, direction);
        }

        let mut total_gain = 0usize;
        let mut gain_sum = 0.0_f64;
        let mut max_gain = f64::NEG_INFINITY;
        let mut max_drawdown = f64::INFINITY;
        let mut drawdown_sum = 0.0_f64;
        let mut volume_sum = 0.0_f64;
        let mut cumulative_result = 0.0_f64;

        for op in operations {
            if op.result_percent > 0.0 {
                total_gain += 1;
                gain_sum += op.result_percent;
                max_gain = max_gain.max(op.result_percent);
            }
            max_drawdown = max_drawdown.min(op.drawdown_percent);
            drawdown_sum += op.drawdown_percent;
            volume_sum += op.volume;
            cumulative_result += op.result_percent;
        }

        let total_loss = total_operations - total_gain;
        let n = total_operations as f64;

        let (max_gain, mean_gain) = if total_gain > 0 {
            (max_gain, gain_sum / total_gain as f64)
        } else {
            (0.0, 0.0)
        };

        Self {
            security_id,
            direction,
            total_operations,
            total_gain,
            percent_gain: total_gain as f64 / n * 100.0,
            total_loss,
            percent_loss: total_loss as f64 / n * 100.0,
            max_gain,
            mean_gain,
            max_drawdown,
            mean_drawdown: drawdown_sum / n,
            mean_volume: volume_sum / n,
            cumulative_result,
        }
    }

    fn empty(security_id: String, direction: Direction) -> Self {
        Self {
            security_id,
            direction,
            total_operations: 0,
            total_gain: 0,
            percent_gain: 0.0,
            total_loss: 0,
            percent_loss: 0.0,
            max_gain: 0.0,
            mean_gain: 0.0,
            max_drawdown: 0.0,
            mean_drawdown: 0.0,
            mean_volume: 0.0,
            cumulative_result: 0.0,
        }
    }
}

/// Totals across every row of a report.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub securities: usize,
    pub total_operations: usize,
    pub win_rate: f64,
    pub cumulative_result: f64,
}

impl BatchSummary {
    pub fn from_results(results: &[AnalysisResult]) -> Self {
        let total_operations: usize = results.iter().map(|r| r.total_operations).sum();
        let total_gain: usize = results.iter().map(|r| r.total_gain).sum();
        let win_rate = if total_operations > 0 {
            total_gain as f64 / total_operations as f64 * 100.0
        } else {
            0.0
        };

        Self {
            securities: results.len(),
            total_operations,
            win_rate,
            cumulative_result: results.iter().map(|r| r.cumulative_result).sum(),
        }
    }
}
