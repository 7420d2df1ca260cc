//! Simulation parameters for a trigger scan.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// Side of the simulated order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Buy on an upward breakout above the reference price.
    Long,
    /// Sell on a downward breakout below the reference price.
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => f.pad("long"),
            Direction::Short => f.pad("short"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" | "buy" => Ok(Direction::Long),
            "short" | "sell" => Ok(Direction::Short),
            other => Err(format!("unknown direction '{other}' (expected long or short)")),
        }
    }
}

/// Price field that anchors the trigger price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryReference {
    PrevClose,
    PrevHigh,
    PrevLow,
    PrevOpen,
    TodayOpen,
}

impl fmt::Display for EntryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryReference::PrevClose => "prev_close",
            EntryReference::PrevHigh => "prev_high",
            EntryReference::PrevLow => "prev_low",
            EntryReference::PrevOpen => "prev_open",
            EntryReference::TodayOpen => "today_open",
        };
        f.write_str(name)
    }
}

impl FromStr for EntryReference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "prevclose" => Ok(EntryReference::PrevClose),
            "prevhigh" => Ok(EntryReference::PrevHigh),
            "prevlow" => Ok(EntryReference::PrevLow),
            "prevopen" => Ok(EntryReference::PrevOpen),
            "todayopen" => Ok(EntryReference::TodayOpen),
            _ => Err(format!(
                "unknown entry reference '{}' (expected prev_close, prev_high, prev_low, prev_open or today_open)",
                s.trim()
            )),
        }
    }
}

/// Price field used as the exit of a triggered day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReference {
    DayHigh,
    DayClose,
}

impl fmt::Display for ExitReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReference::DayHigh => write!(f, "day_high"),
            ExitReference::DayClose => write!(f, "day_close"),
        }
    }
}

impl FromStr for ExitReference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "dayhigh" => Ok(ExitReference::DayHigh),
            "dayclose" => Ok(ExitReference::DayClose),
            _ => Err(format!(
                "unknown exit reference '{}' (expected day_high or day_close)",
                s.trim()
            )),
        }
    }
}

/// Accepts `prev_close`, `prev-close` and `prevClose` alike.
fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect::<String>()
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub direction: Direction,
    pub trigger_percent: f64,
    pub min_volume: Option<f64>,
    pub entry_reference: EntryReference,
    pub exit_reference: ExitReference,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            direction: Direction::Long,
            trigger_percent: 2.0,
            min_volume: None,
            entry_reference: EntryReference::PrevClose,
            exit_reference: ExitReference::DayHigh,
            start_date: None,
            end_date: None,
        }
    }
}
