//! End-to-end analysis tests over mock, CSV and SQLite bar providers.

mod common;

use approx::assert_relative_eq;
use common::*;
use std::process::ExitCode;
use triggerscan::adapters::csv_adapter::CsvAdapter;
use triggerscan::adapters::history_import::parse_history;
use triggerscan::domain::analysis::Analyzer;
use triggerscan::domain::error::ScanError;
use triggerscan::domain::metrics::BatchSummary;
use triggerscan::domain::params::{Direction, EntryReference, ExitReference, SimulationParams};
use triggerscan::domain::universe::SkipReason;
use triggerscan::ports::data_port::{BarStore, DataPort};

fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn long_params(percent: f64) -> SimulationParams {
    SimulationParams {
        direction: Direction::Long,
        trigger_percent: percent,
        ..SimulationParams::default()
    }
}

fn short_params(percent: f64) -> SimulationParams {
    SimulationParams {
        direction: Direction::Short,
        trigger_percent: percent,
        ..SimulationParams::default()
    }
}

mod scenarios {
    use super::*;

    fn two_day_port() -> MockDataPort {
        MockDataPort::new().with_bars(
            "AAA",
            vec![
                bar(2, 100.0, 105.0, 95.0, 102.0, 1000.0),
                bar(3, 102.0, 108.0, 101.0, 107.0, 1000.0),
            ],
        )
    }

    #[test]
    fn breakout_at_previous_close() {
        let port = two_day_port();
        let outcome = Analyzer::new(&port)
            .run_analysis(&[], &long_params(0.0))
            .unwrap();

        let r = &outcome.results[0];
        assert_eq!(r.total_operations, 1);
        assert_eq!(r.total_gain, 1);
        assert_relative_eq!(r.max_gain, 6.0 / 102.0 * 100.0, epsilon = 1e-9);
        assert_relative_eq!(r.max_drawdown, -1.0 / 102.0 * 100.0, epsilon = 1e-9);
        assert_relative_eq!(r.cumulative_result, 5.882352941, epsilon = 1e-6);
    }

    #[test]
    fn two_percent_long_trigger() {
        let port = two_day_port();
        let outcome = Analyzer::new(&port)
            .run_analysis(&[], &long_params(2.0))
            .unwrap();

        let trigger = 102.0 * 1.02;
        let r = &outcome.results[0];
        assert_eq!(r.total_operations, 1);
        assert_relative_eq!(r.cumulative_result, (108.0 - trigger) / trigger * 100.0, epsilon = 1e-9);
        assert_relative_eq!(r.mean_drawdown, (101.0 - trigger) / trigger * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn short_not_triggered_yields_zero_row() {
        let port = two_day_port();
        let outcome = Analyzer::new(&port)
            .run_analysis(&[], &short_params(2.0))
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        let r = &outcome.results[0];
        assert_eq!(r.direction, Direction::Short);
        assert_eq!(r.total_operations, 0);
        assert_eq!(r.percent_gain, 0.0);
        assert_eq!(r.percent_loss, 0.0);
        assert_eq!(r.max_drawdown, 0.0);
        assert_eq!(r.mean_volume, 0.0);
        assert_eq!(r.cumulative_result, 0.0);
    }
}

mod simulation {
    use super::*;

    #[test]
    fn long_day_high_over_multi_day_series() {
        let port = MockDataPort::new().with_bars("PETR4", petr4_bars());
        let outcome = Analyzer::new(&port)
            .run_analysis(&codes(&["PETR4"]), &long_params(2.0))
            .unwrap();

        let first = (108.0 - 104.04) / 104.04 * 100.0;
        let second = (112.0 - 107.1) / 107.1 * 100.0;

        let r = &outcome.results[0];
        assert_eq!(r.total_operations, 2);
        assert_eq!(r.total_gain, 2);
        assert_eq!(r.total_loss, 0);
        assert_relative_eq!(r.percent_gain, 100.0);
        assert_relative_eq!(r.max_gain, second, epsilon = 1e-9);
        assert_relative_eq!(r.mean_gain, (first + second) / 2.0, epsilon = 1e-9);
        assert_relative_eq!(r.cumulative_result, first + second, epsilon = 1e-9);
        assert_relative_eq!(r.max_drawdown, (103.0 - 107.1) / 107.1 * 100.0, epsilon = 1e-9);
        assert_relative_eq!(r.mean_volume, 2500.0);
    }

    #[test]
    fn short_day_high_records_a_loss() {
        let port = MockDataPort::new().with_bars("PETR4", petr4_bars());
        let outcome = Analyzer::new(&port)
            .run_analysis(&[], &short_params(2.0))
            .unwrap();

        let trigger = 107.0 * 0.98;
        let r = &outcome.results[0];
        assert_eq!(r.total_operations, 1);
        assert_eq!(r.total_loss, 1);
        assert_relative_eq!(r.percent_loss, 100.0);
        assert_eq!(r.max_gain, 0.0);
        assert_eq!(r.mean_gain, 0.0);
        assert_relative_eq!(r.cumulative_result, (trigger - 108.0) / trigger * 100.0, epsilon = 1e-9);
        assert_relative_eq!(r.mean_volume, 500.0);
    }

    #[test]
    fn day_close_exit_changes_outcome() {
        let port = MockDataPort::new().with_bars("PETR4", petr4_bars());
        let params = SimulationParams {
            exit_reference: ExitReference::DayClose,
            ..long_params(2.0)
        };
        let outcome = Analyzer::new(&port).run_analysis(&[], &params).unwrap();

        let expected = (107.0 - 104.04) / 104.04 * 100.0 + (110.0 - 107.1) / 107.1 * 100.0;
        assert_relative_eq!(outcome.results[0].cumulative_result, expected, epsilon = 1e-9);
    }

    #[test]
    fn min_volume_excludes_quiet_days() {
        let port = MockDataPort::new().with_bars("PETR4", petr4_bars());
        let params = SimulationParams {
            min_volume: Some(2500.0),
            ..long_params(2.0)
        };
        let outcome = Analyzer::new(&port).run_analysis(&[], &params).unwrap();

        let r = &outcome.results[0];
        assert_eq!(r.total_operations, 1);
        assert_relative_eq!(r.mean_volume, 3000.0);
    }

    #[test]
    fn today_open_reference() {
        let port = MockDataPort::new().with_bars("PETR4", petr4_bars());
        let params = SimulationParams {
            entry_reference: EntryReference::TodayOpen,
            ..long_params(6.0)
        };
        let outcome = Analyzer::new(&port).run_analysis(&[], &params).unwrap();

        // Only Jan 5 reaches open * 1.06 (111.3 vs high 112); Jan 3 needs 108.12.
        let trigger = 105.0 * 1.06;
        let r = &outcome.results[0];
        assert_eq!(r.total_operations, 1);
        assert_relative_eq!(r.cumulative_result, (112.0 - trigger) / trigger * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn date_range_limits_the_series() {
        let port = MockDataPort::new().with_bars("PETR4", petr4_bars());
        let params = SimulationParams {
            start_date: Some(date(2024, 1, 4)),
            ..long_params(2.0)
        };
        let outcome = Analyzer::new(&port).run_analysis(&[], &params).unwrap();

        // Jan 4 becomes the reference bar, so only Jan 5 is evaluated.
        assert_eq!(outcome.results[0].total_operations, 1);
    }
}

mod orchestration {
    use super::*;

    fn mixed_port() -> MockDataPort {
        MockDataPort::new()
            .with_bars("PETR4", petr4_bars())
            .with_bars("VALE3", drifting_bars(30, 60.0, 0.5))
            .with_bars("ITUB4", vec![bar(2, 30.0, 31.0, 29.0, 30.5, 100.0)])
            .with_error("BBAS3", "disk on fire")
    }

    #[test]
    fn requested_order_is_preserved() {
        let port = mixed_port();
        let outcome = Analyzer::new(&port)
            .run_analysis(&codes(&["VALE3", "PETR4"]), &long_params(1.0))
            .unwrap();
        let ids: Vec<&str> = outcome.results.iter().map(|r| r.security_id.as_str()).collect();
        assert_eq!(ids, vec!["VALE3", "PETR4"]);
    }

    #[test]
    fn duplicate_requests_analysed_once() {
        let port = mixed_port();
        let outcome = Analyzer::new(&port)
            .run_analysis(&codes(&["PETR4", "PETR4"]), &long_params(1.0))
            .unwrap();
        assert_eq!(outcome.results.len(), 1);
    }

    #[test]
    fn empty_request_uses_listing_order() {
        let port = mixed_port();
        let outcome = Analyzer::new(&port)
            .run_analysis(&[], &long_params(1.0))
            .unwrap();
        let ids: Vec<&str> = outcome.results.iter().map(|r| r.security_id.as_str()).collect();
        assert_eq!(ids, vec!["PETR4", "VALE3"]);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].code, "ITUB4");
    }

    #[test]
    fn provider_error_skips_only_that_security() {
        let port = mixed_port();
        let outcome = Analyzer::new(&port)
            .run_analysis(&codes(&["BBAS3", "PETR4", "XXXX3"]), &long_params(1.0))
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        let skipped: Vec<(&str, &SkipReason)> = outcome
            .skipped
            .iter()
            .map(|s| (s.code.as_str(), &s.reason))
            .collect();
        assert_eq!(
            skipped,
            vec![
                ("BBAS3", &SkipReason::Unavailable),
                ("XXXX3", &SkipReason::Unavailable),
            ]
        );
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut port = MockDataPort::new();
        for i in 0..24u32 {
            port = port.with_bars(
                &format!("SEC{:02}", i),
                drifting_bars(40 + i, 10.0 + i as f64, 0.01 * (i as f64 - 12.0)),
            );
        }

        for params in [long_params(1.5), short_params(1.5)] {
            let parallel = Analyzer::new(&port)
                .with_parallelism(true)
                .run_analysis(&[], &params)
                .unwrap();
            let sequential = Analyzer::new(&port)
                .with_parallelism(false)
                .run_analysis(&[], &params)
                .unwrap();
            assert_eq!(parallel.results, sequential.results);
        }
    }

    #[test]
    fn batch_summary_over_results() {
        let port = mixed_port();
        let outcome = Analyzer::new(&port)
            .run_analysis(&codes(&["PETR4", "VALE3"]), &long_params(2.0))
            .unwrap();
        let summary = BatchSummary::from_results(&outcome.results);

        let ops: usize = outcome.results.iter().map(|r| r.total_operations).sum();
        let gains: usize = outcome.results.iter().map(|r| r.total_gain).sum();
        let cumulative: f64 = outcome.results.iter().map(|r| r.cumulative_result).sum();

        assert_eq!(summary.securities, 2);
        assert_eq!(summary.total_operations, ops);
        assert_relative_eq!(summary.win_rate, gains as f64 / ops as f64 * 100.0);
        assert_relative_eq!(summary.cumulative_result, cumulative);
    }
}

mod errors {
    use super::*;

    fn exit_code(err: &ScanError) -> String {
        format!("{:?}", ExitCode::from(err))
    }

    #[test]
    fn unavailable_and_insufficient_are_named() {
        let port = MockDataPort::new().with_bars("ITUB4", vec![bar(2, 1.0, 1.0, 1.0, 1.0, 1.0)]);
        let err = Analyzer::new(&port)
            .run_analysis(&codes(&["ITUB4", "GONE3"]), &long_params(2.0))
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("GONE3"));
        assert!(message.contains("insufficient data: ITUB4"));
        assert_eq!(exit_code(&err), format!("{:?}", ExitCode::from(5)));
    }

    #[test]
    fn empty_provider_is_configuration_error() {
        let port = MockDataPort::new();
        let err = Analyzer::new(&port)
            .run_analysis(&[], &long_params(2.0))
            .unwrap_err();
        assert!(matches!(err, ScanError::NoSecurities));
    }

    #[test]
    fn invalid_short_percent_rejected_before_fetch() {
        let port = MockDataPort::new().with_error("PETR4", "must not be read");
        let err = Analyzer::new(&port)
            .run_analysis(&codes(&["PETR4"]), &short_params(150.0))
            .unwrap_err();
        assert!(matches!(err, ScanError::ConfigInvalid { .. }));
        assert_eq!(exit_code(&err), format!("{:?}", ExitCode::from(2)));
    }
}

mod csv_store {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn stored_bars_are_analysed() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        adapter.store_bars("PETR4", &petr4_bars()).unwrap();
        adapter
            .store_bars("ITUB4", &[bar(2, 30.0, 31.0, 29.0, 30.5, 100.0)])
            .unwrap();

        assert_eq!(adapter.list_securities().unwrap(), codes(&["ITUB4", "PETR4"]));

        let outcome = Analyzer::new(&adapter)
            .run_analysis(&[], &long_params(2.0))
            .unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].security_id, "PETR4");
        assert_eq!(outcome.results[0].total_operations, 2);
    }
}

#[cfg(feature = "sqlite")]
mod sqlite_store {
    use super::*;
    use triggerscan::adapters::sqlite_adapter::SqliteAdapter;

    const EXPORT: &str = "\"Data\",\"Último\",\"Abertura\",\"Máxima\",\"Mínima\",\"Vol.\",\"Var%\"\n\
        \"05.01.2024\",\"110,00\",\"105,00\",\"112,00\",\"103,00\",\"3,00K\",\"4,76%\"\n\
        \"04.01.2024\",\"105,00\",\"107,00\",\"108,00\",\"104,00\",\"0,50K\",\"-1,87%\"\n\
        \"03.01.2024\",\"107,00\",\"102,00\",\"108,00\",\"101,00\",\"2,00K\",\"4,90%\"\n\
        \"02.01.2024\",\"102,00\",\"100,00\",\"105,00\",\"95,00\",\"1,00K\",\"0,00%\"\n";

    #[test]
    fn imported_history_matches_in_memory_series() {
        let store = SqliteAdapter::in_memory().unwrap();
        let parsed = parse_history(EXPORT.as_bytes(), "PETR4.csv").unwrap();
        assert_eq!(parsed.bars, petr4_bars());
        store.store_bars("PETR4", &parsed.bars).unwrap();

        let from_db = Analyzer::new(&store)
            .run_analysis(&[], &long_params(2.0))
            .unwrap();
        let mock = MockDataPort::new().with_bars("PETR4", petr4_bars());
        let from_mock = Analyzer::new(&mock)
            .run_analysis(&[], &long_params(2.0))
            .unwrap();

        assert_eq!(from_db.results, from_mock.results);
    }

    #[test]
    fn inactive_security_is_not_listed_but_still_fetchable() {
        let store = SqliteAdapter::in_memory().unwrap();
        store.store_bars("PETR4", &petr4_bars()).unwrap();
        store.store_bars("VALE3", &drifting_bars(10, 60.0, 0.5)).unwrap();
        store.set_active("VALE3", false).unwrap();

        assert_eq!(store.list_securities().unwrap(), codes(&["PETR4"]));

        let outcome = Analyzer::new(&store)
            .run_analysis(&codes(&["VALE3"]), &long_params(1.0))
            .unwrap();
        assert_eq!(outcome.results.len(), 1);
    }

    #[test]
    fn data_range_after_import() {
        let store = SqliteAdapter::in_memory().unwrap();
        store.store_bars("PETR4", &petr4_bars()).unwrap();
        assert_eq!(
            store.get_data_range("PETR4").unwrap(),
            Some((date(2024, 1, 2), date(2024, 1, 5), 4))
        );
        assert_eq!(store.get_data_range("NONE3").unwrap(), None);
    }
}
