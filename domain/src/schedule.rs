use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, ValidationError};
use crate::event::{EventKind, LineSchedule};

/// Strategy selector: a closed set of variants behind a single dispatch
/// function. A new strategy is a new variant plus a branch, not a trait
/// hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyTag {
    Lpt,
    Spt,
    Cfs,
    Smart,
    Hybrid,
    Milp,
}

impl StrategyTag {
    pub const ALL: [StrategyTag; 6] = [
        StrategyTag::Lpt,
        StrategyTag::Spt,
        StrategyTag::Cfs,
        StrategyTag::Smart,
        StrategyTag::Hybrid,
        StrategyTag::Milp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyTag::Lpt => "lpt",
            StrategyTag::Spt => "spt",
            StrategyTag::Cfs => "cfs",
            StrategyTag::Smart => "smart",
            StrategyTag::Hybrid => "hybrid",
            StrategyTag::Milp => "milp",
        }
    }
}

impl fmt::Display for StrategyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyTag {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lpt" => Ok(StrategyTag::Lpt),
            "spt" => Ok(StrategyTag::Spt),
            "cfs" => Ok(StrategyTag::Cfs),
            "smart" => Ok(StrategyTag::Smart),
            "hybrid" => Ok(StrategyTag::Hybrid),
            "milp" => Ok(StrategyTag::Milp),
            other => Err(ValidationError::new(
                "strategy",
                "unknown strategy tag",
                other,
            )),
        }
    }
}

/// Aggregate quality metrics reported alongside every schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScheduleMetrics {
    /// Mean over configured lines of (fill seconds / makespan), 0..1.
    pub utilization: f64,
    pub changeovers: u32,
    pub window_violations: u32,
    pub lots_placed: u32,
}

/// Classification of a validator finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    MissingLot,
    DuplicateFill,
    UnknownLot,
    InvalidEventSpan,
    OverlappingEvents,
    GapBetweenEvents,
    MissingOpeningClean,
    WrongCleanDuration,
    WindowOverrun,
    WrongChangeoverDuration,
}

/// One validator finding, anchored to a line and an instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub line_id: u32,
    #[serde(rename = "at_seconds")]
    pub at: u64,
    pub detail: String,
}

/// A lot a strategy could not place, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnscheduledLot {
    pub lot_id: String,
    pub reason: String,
}

/// A frozen, time-annotated schedule. Built append-only per line by a
/// strategy, then never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct Schedule {
    pub strategy: StrategyTag,
    #[serde(rename = "makespan_seconds")]
    pub makespan: u64,
    pub lines: Vec<LineSchedule>,
    pub metrics: ScheduleMetrics,
    pub violations: Vec<Violation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unscheduled: Vec<UnscheduledLot>,
    /// Stamp only; excluded from the serialized contract so identical
    /// inputs serialize byte-identically.
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
}

impl Schedule {
    /// Lot ids referenced by fill events, in id order.
    pub fn lots_placed(&self) -> BTreeSet<&str> {
        self.lines
            .iter()
            .flat_map(|line| line.events.iter())
            .filter(|event| event.kind == EventKind::Fill)
            .filter_map(|event| event.lot_id.as_deref())
            .collect()
    }
}

/// Outcome of one strategy execution. Exactly one of `schedule` and
/// `error` is present; `timed_out` with a schedule means the deadline
/// expired and the schedule is the best-so-far partial.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyResult {
    pub tag: StrategyTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    pub wallclock_ms: u64,
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EngineError>,
}

impl StrategyResult {
    pub fn is_ok(&self) -> bool {
        self.schedule.is_some() && self.error.is_none()
    }
}

/// Ranked side-by-side comparison of strategies over one input.
/// `results` preserves request order.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub run_id: Uuid,
    pub results: Vec<StrategyResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_tag: Option<StrategyTag>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_roundtrips_through_str() {
        for tag in StrategyTag::ALL {
            assert_eq!(tag.as_str().parse::<StrategyTag>().unwrap(), tag);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = "genetic".parse::<StrategyTag>().unwrap_err();
        assert_eq!(err.field, "strategy");
        assert_eq!(err.value, "genetic");
    }

    #[test]
    fn tag_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&StrategyTag::Milp).unwrap(),
            r#""milp""#
        );
    }

    #[test]
    fn violation_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ViolationKind::WindowOverrun).unwrap(),
            r#""window_overrun""#
        );
    }
}
