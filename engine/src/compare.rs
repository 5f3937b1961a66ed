//! Side-by-side strategy comparison.
//!
//! Responsibilities:
//! - Fan strategies out across blocking workers, one per strategy, each
//!   under an independent wallclock deadline.
//! - Isolate failures: one strategy erroring or timing out never affects
//!   the others.
//! - Collect results back in request order (never completion order, so
//!   reruns are reproducible) and rank them.

use std::time::Duration;

use futures::future::join_all;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use domain::config::ScheduleConfig;
use domain::error::EngineError;
use domain::lot::LotSet;
use domain::schedule::{Report, StrategyResult, StrategyTag};

use crate::feasibility;
use crate::solver::BranchBoundSolver;
use crate::strategy::{self, Deadline};

/// Lexicographic ranking key, lower is better:
/// (violations, makespan, changeovers, -utilization, wallclock).
/// Utilization enters negated in fixed-point micro-units so the order
/// stays total. `None` for failed results, which never rank.
pub fn ranking_key(result: &StrategyResult) -> Option<(u64, u64, u32, i64, u64)> {
    if !result.is_ok() {
        return None;
    }
    let schedule = result.schedule.as_ref()?;
    Some((
        schedule.violations.len() as u64,
        schedule.makespan,
        schedule.metrics.changeovers,
        -((schedule.metrics.utilization * 1_000_000.0).round() as i64),
        result.wallclock_ms,
    ))
}

/// Run every requested strategy against the same input and produce a
/// ranked [`Report`]. Input validation failures are fatal and surface
/// before any strategy runs.
#[instrument(skip(lots, config, tags), fields(lots = lots.len(), strategies = tags.len()))]
pub async fn compare(
    lots: &LotSet,
    config: &ScheduleConfig,
    tags: &[StrategyTag],
) -> Result<Report, EngineError> {
    feasibility::validate_input(lots, config)?;

    let handles: Vec<_> = tags
        .iter()
        .map(|&tag| {
            // Each worker owns its input copy, deadline, and solver;
            // no shared mutable state between strategy runs.
            let lots = lots.clone();
            let config = config.clone();
            tokio::task::spawn_blocking(move || {
                let deadline =
                    Deadline::after(Duration::from_secs(config.strategy_timeout_secs));
                let solver = BranchBoundSolver::default();
                strategy::run_validated(tag, &lots, &config, deadline, &solver)
            })
        })
        .collect();

    let mut results = Vec::with_capacity(tags.len());
    for (tag, joined) in tags.iter().zip(join_all(handles).await) {
        match joined {
            Ok(result) => results.push(result),
            Err(join_error) => {
                warn!(strategy = %tag, %join_error, "strategy worker died");
                results.push(StrategyResult {
                    tag: *tag,
                    schedule: None,
                    wallclock_ms: 0,
                    timed_out: false,
                    error: Some(EngineError::Internal {
                        detail: format!("strategy worker died: {join_error}"),
                    }),
                });
            }
        }
    }

    // First minimal key wins, so equal-quality strategies rank in
    // request order.
    let best_tag = results
        .iter()
        .filter_map(|result| ranking_key(result).map(|key| (key, result.tag)))
        .min_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, tag)| tag);

    info!(best = ?best_tag, "comparison finished");

    Ok(Report {
        run_id: Uuid::new_v4(),
        results,
        best_tag,
    })
}
