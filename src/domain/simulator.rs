//! Day-by-day trigger simulation for one security.

use super::bar::DailyBar;
use super::params::SimulationParams;
use super::trigger;

/// Outcome of one triggering day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Operation {
    pub result_percent: f64,
    pub drawdown_percent: f64,
    pub volume: f64,
}

/// Walks `bars` from the second bar on, producing one operation per
/// triggering day.
///
/// Every day is evaluated on its own: no position is carried from one day to
/// the next. The first bar only serves as the previous-day reference. Fewer
/// than two bars yield no operations.
pub fn simulate(bars: &[DailyBar], params: &SimulationParams) -> Vec<Operation> {
    let mut operations = Vec::new();

    for window in bars.windows(2) {
        let previous = &window[0];
        let current = &window[1];

        if params.min_volume.is_some_and(|min| current.volume < min) {
            continue;
        }

        let trigger_price = trigger::trigger_price(
            current,
            previous,
            params.entry_reference,
            params.trigger_percent,
            params.direction,
        );

        // A non-positive trigger (malformed or zero reference price) cannot
        // anchor a percentage, so the day is not evaluated.
        if !trigger_price.is_finite() || trigger_price <= 0.0 {
            tracing::debug!(date = %current.date, trigger_price, "skipping day with non-positive trigger");
            continue;
        }

        if !trigger::is_triggered(current, trigger_price, params.direction) {
            continue;
        }

        operations.push(Operation {
            result_percent: trigger::operation_result(
                current,
                trigger_price,
                params.exit_reference,
                params.direction,
            ),
            drawdown_percent: trigger::drawdown(current, trigger_price, params.direction),
            volume: current.volume,
        });
    }

    operations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::params::{Direction, EntryReference, ExitReference};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn bar(day: u32, open: f64, high: f64, low: f64, close: f64, volume: f64) -> DailyBar {
        DailyBar::new(
            NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            open,
            high,
            low,
            close,
            volume,
        )
    }

    fn two_day_series() -> Vec<DailyBar> {
        vec![
            bar(1, 100.0, 105.0, 95.0, 102.0, 1_000.0),
            bar(2, 102.0, 108.0, 101.0, 107.0, 2_000.0),
        ]
    }

    fn long_params(percent: f64) -> SimulationParams {
        SimulationParams {
            direction: Direction::Long,
            trigger_percent: percent,
            entry_reference: EntryReference::PrevClose,
            exit_reference: ExitReference::DayHigh,
            ..SimulationParams::default()
        }
    }

    #[test]
    fn empty_and_single_bar_yield_nothing() {
        let params = long_params(2.0);
        assert!(simulate(&[], &params).is_empty());
        assert!(simulate(&two_day_series()[..1], &params).is_empty());
    }

    #[test]
    fn long_trigger_records_operation() {
        let ops = simulate(&two_day_series(), &long_params(0.0));
        assert_eq!(ops.len(), 1);
        assert_relative_eq!(ops[0].result_percent, 5.882_352_941, epsilon = 1e-6);
        assert_relative_eq!(ops[0].drawdown_percent, -0.980_392_157, epsilon = 1e-6);
        assert_eq!(ops[0].volume, 2_000.0);
    }

    #[test]
    fn short_not_triggered_yields_nothing() {
        let params = SimulationParams {
            direction: Direction::Short,
            ..long_params(2.0)
        };
        assert!(simulate(&two_day_series(), &params).is_empty());
    }

    #[test]
    fn low_volume_day_is_skipped_even_if_range_triggers() {
        let params = SimulationParams {
            min_volume: Some(5_000.0),
            ..long_params(0.0)
        };
        assert!(simulate(&two_day_series(), &params).is_empty());
    }

    #[test]
    fn volume_equal_to_minimum_is_kept() {
        let params = SimulationParams {
            min_volume: Some(2_000.0),
            ..long_params(0.0)
        };
        assert_eq!(simulate(&two_day_series(), &params).len(), 1);
    }

    #[test]
    fn first_bar_volume_is_irrelevant() {
        let mut bars = two_day_series();
        bars[0].volume = 0.0;
        let params = SimulationParams {
            min_volume: Some(1_500.0),
            ..long_params(0.0)
        };
        assert_eq!(simulate(&bars, &params).len(), 1);
    }

    #[test]
    fn consecutive_triggers_each_produce_an_operation() {
        let bars = vec![
            bar(1, 10.0, 10.5, 9.5, 10.0, 100.0),
            bar(2, 10.0, 11.0, 9.8, 10.8, 100.0),
            bar(3, 10.8, 11.5, 10.6, 11.2, 100.0),
            bar(4, 11.2, 11.3, 10.9, 11.0, 100.0),
        ];
        // 1% above previous close: 10.1, 10.908, 11.312
        let ops = simulate(&bars, &long_params(1.0));
        assert_eq!(ops.len(), 2);
    }

    #[test]
    fn today_open_reference_uses_current_bar() {
        let bars = vec![
            bar(1, 50.0, 50.0, 50.0, 50.0, 10.0),
            bar(2, 100.0, 103.0, 99.0, 101.0, 10.0),
        ];
        let params = SimulationParams {
            entry_reference: EntryReference::TodayOpen,
            exit_reference: ExitReference::DayClose,
            ..long_params(2.0)
        };
        let ops = simulate(&bars, &params);
        assert_eq!(ops.len(), 1);
        assert_relative_eq!(
            ops[0].result_percent,
            (101.0 - 102.0) / 102.0 * 100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn zero_reference_price_is_not_evaluated() {
        let bars = vec![
            bar(1, 0.0, 0.0, 0.0, 0.0, 10.0),
            bar(2, 1.0, 2.0, 0.5, 1.5, 10.0),
        ];
        assert!(simulate(&bars, &long_params(2.0)).is_empty());
    }
}
