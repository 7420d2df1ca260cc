//! Trigger price calculation and per-day outcome rules.
//!
//! A trigger models a stop order filled exactly at the trigger price: no
//! slippage, no partial fills, and no ordering of intraday events. Outcome
//! and drawdown are read from the full day's range.

use super::bar::DailyBar;
use super::params::{Direction, EntryReference, ExitReference};

/// Resolves the reference price a trigger is anchored to.
pub fn base_price(current: &DailyBar, previous: &DailyBar, reference: EntryReference) -> f64 {
    match reference {
        EntryReference::PrevClose => previous.close,
        EntryReference::PrevHigh => previous.high,
        EntryReference::PrevLow => previous.low,
        EntryReference::PrevOpen => previous.open,
        EntryReference::TodayOpen => current.open,
    }
}

/// base * (1 + p/100) for long, base * (1 - p/100) for short.
pub fn trigger_price(
    current: &DailyBar,
    previous: &DailyBar,
    reference: EntryReference,
    percent: f64,
    direction: Direction,
) -> f64 {
    let base = base_price(current, previous, reference);
    let multiplier = match direction {
        Direction::Long => 1.0 + percent / 100.0,
        Direction::Short => 1.0 - percent / 100.0,
    };
    base * multiplier
}

/// Long fills when the day's high reaches the trigger, short when the low does.
pub fn is_triggered(current: &DailyBar, trigger: f64, direction: Direction) -> bool {
    match direction {
        Direction::Long => current.high >= trigger,
        Direction::Short => current.low <= trigger,
    }
}

pub fn exit_price(current: &DailyBar, reference: ExitReference) -> f64 {
    match reference {
        ExitReference::DayHigh => current.high,
        ExitReference::DayClose => current.close,
    }
}

/// Percentage result of a position opened at `trigger` and closed at the exit reference.
pub fn operation_result(
    current: &DailyBar,
    trigger: f64,
    reference: ExitReference,
    direction: Direction,
) -> f64 {
    let exit = exit_price(current, reference);
    match direction {
        Direction::Long => (exit - trigger) / trigger * 100.0,
        Direction::Short => (trigger - exit) / trigger * 100.0,
    }
}

/// Adverse excursion from the trigger to the worst price of the day.
///
/// Negative values mean the day traded against the position.
pub fn drawdown(current: &DailyBar, trigger: f64, direction: Direction) -> f64 {
    match direction {
        Direction::Long => (current.low - trigger) / trigger * 100.0,
        Direction::Short => (trigger - current.high) / trigger * 100.0,
    }
}
