//! Strategy dispatch.
//!
//! Strategies are a closed set of variants behind a single dispatch
//! function: a new strategy is a new variant plus a branch, not an open
//! trait hierarchy. Every strategy shares the feasibility kernel and the
//! per-line builder; they differ only in ordering and placement policy.
//!
//! Flow per run:
//! 1) input is pre-validated (fatal before any strategy),
//! 2) the strategy builds line states append-only under a cooperative
//!    deadline,
//! 3) the result is frozen: independently re-validated, measured, and
//!    stamped.

pub(crate) mod greedy;
pub(crate) mod milp;
pub(crate) mod smartpack;

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, instrument};

use domain::config::ScheduleConfig;
use domain::error::EngineError;
use domain::event::LineSchedule;
use domain::lot::LotSet;
use domain::schedule::{Schedule, StrategyResult, StrategyTag, UnscheduledLot, ViolationKind};

use crate::feasibility;
use crate::line::LineState;
use crate::metrics;
use crate::solver::{BranchBoundSolver, Solver};
use crate::validator;

/// Cooperative cancellation point, checked between lot insertions by the
/// heuristics and per search node by the bundled solver.
#[derive(Clone, Copy, Debug)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.0
    }

    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }
}

/// Raw strategy output before validation, metrics, and freezing.
#[derive(Debug)]
pub(crate) struct BuiltSchedule {
    pub lines: Vec<LineState>,
    pub unscheduled: Vec<UnscheduledLot>,
    pub timed_out: bool,
}

pub(crate) fn fresh_lines(config: &ScheduleConfig) -> Vec<LineState> {
    (0..config.num_lines).map(LineState::new).collect()
}

/// Plan `lots` with a single strategy, using the bundled default solver
/// for `milp`.
pub fn schedule(
    lots: &LotSet,
    config: &ScheduleConfig,
    tag: StrategyTag,
) -> Result<Schedule, EngineError> {
    schedule_with_solver(lots, config, tag, &BranchBoundSolver::default())
}

/// Strategy-agnostic entry point with an explicit solver capability.
pub fn schedule_with_solver(
    lots: &LotSet,
    config: &ScheduleConfig,
    tag: StrategyTag,
    solver: &dyn Solver,
) -> Result<Schedule, EngineError> {
    feasibility::validate_input(lots, config)?;
    let deadline = Deadline::after(Duration::from_secs(config.strategy_timeout_secs));
    let result = run_validated(tag, lots, config, deadline, solver);
    match (result.schedule, result.error) {
        (Some(schedule), None) => Ok(schedule),
        (_, Some(error)) => Err(error),
        (None, None) => Err(EngineError::Internal {
            detail: "strategy returned neither schedule nor error".into(),
        }),
    }
}

/// Run one strategy against pre-validated input.
///
/// Failures land in the result's `error` slot; exactly one of
/// `schedule`/`error` is populated.
#[instrument(skip(lots, config, solver), fields(strategy = %tag, lots = lots.len()))]
pub(crate) fn run_validated(
    tag: StrategyTag,
    lots: &LotSet,
    config: &ScheduleConfig,
    deadline: Deadline,
    solver: &dyn Solver,
) -> StrategyResult {
    let started = Instant::now();

    let outcome: Result<(Schedule, bool), EngineError> = match tag {
        StrategyTag::Lpt => Ok(freeze(
            tag,
            greedy::run(greedy::Rule::Lpt, lots, config, deadline),
            lots,
            config,
        )),
        StrategyTag::Spt => Ok(freeze(
            tag,
            greedy::run(greedy::Rule::Spt, lots, config, deadline),
            lots,
            config,
        )),
        StrategyTag::Cfs => Ok(freeze(
            tag,
            greedy::run(greedy::Rule::Cfs, lots, config, deadline),
            lots,
            config,
        )),
        StrategyTag::Smart => Ok(freeze(
            tag,
            smartpack::run(lots, config, deadline),
            lots,
            config,
        )),
        StrategyTag::Hybrid => Ok(run_hybrid(lots, config, deadline)),
        StrategyTag::Milp => {
            milp::run(lots, config, deadline, solver).map(|built| freeze(tag, built, lots, config))
        }
    };

    let wallclock_ms = started.elapsed().as_millis() as u64;
    match outcome {
        Ok((schedule, timed_out)) => {
            debug!(
                makespan = schedule.makespan,
                violations = schedule.violations.len(),
                timed_out,
                "strategy finished"
            );
            StrategyResult {
                tag,
                schedule: Some(schedule),
                wallclock_ms,
                timed_out,
                error: None,
            }
        }
        Err(error) => {
            debug!(%error, "strategy failed");
            let timed_out = matches!(error, EngineError::TimeoutNoIncumbent);
            StrategyResult {
                tag,
                schedule: None,
                wallclock_ms,
                timed_out,
                error: Some(error),
            }
        }
    }
}

/// Validate, measure, and freeze a built schedule. Returns the schedule
/// plus whether the build hit its deadline.
fn freeze(
    tag: StrategyTag,
    built: BuiltSchedule,
    lots: &LotSet,
    config: &ScheduleConfig,
) -> (Schedule, bool) {
    let BuiltSchedule {
        lines,
        unscheduled,
        timed_out,
    } = built;

    let lines: Vec<LineSchedule> = lines.into_iter().map(LineState::into_schedule).collect();
    let violations = validator::validate(&lines, lots, config, &unscheduled);
    let window_violations = violations
        .iter()
        .filter(|v| v.kind == ViolationKind::WindowOverrun)
        .count() as u32;
    let makespan = metrics::makespan(&lines);
    let metrics = metrics::compute(&lines, config.num_lines, window_violations);

    (
        Schedule {
            strategy: tag,
            makespan,
            lines,
            metrics,
            violations,
            unscheduled,
            created_at: Utc::now(),
        },
        timed_out,
    )
}

/// Hybrid meta-selection: SmartPack, LPT, and SPT on the same input;
/// keep the lexicographic best of (violations, makespan, changeovers),
/// re-tagged `hybrid`. Ties keep the earlier candidate, so the choice
/// is deterministic.
fn run_hybrid(lots: &LotSet, config: &ScheduleConfig, deadline: Deadline) -> (Schedule, bool) {
    let candidates = [
        (
            StrategyTag::Smart,
            smartpack::run(lots, config, deadline),
        ),
        (
            StrategyTag::Lpt,
            greedy::run(greedy::Rule::Lpt, lots, config, deadline),
        ),
        (
            StrategyTag::Spt,
            greedy::run(greedy::Rule::Spt, lots, config, deadline),
        ),
    ];

    let mut best: Option<(Schedule, bool)> = None;
    for (tag, built) in candidates {
        let (schedule, timed_out) = freeze(tag, built, lots, config);
        let better = match &best {
            None => true,
            Some((current, _)) => candidate_key(&schedule) < candidate_key(current),
        };
        if better {
            best = Some((schedule, timed_out));
        }
    }

    let (mut schedule, timed_out) = best.expect("hybrid always has candidates");
    schedule.strategy = StrategyTag::Hybrid;
    (schedule, timed_out)
}

fn candidate_key(schedule: &Schedule) -> (usize, u64, u32) {
    (
        schedule.violations.len(),
        schedule.makespan,
        schedule.metrics.changeovers,
    )
}
