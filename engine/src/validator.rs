//! Independent feasibility re-check on a frozen schedule.
//!
//! The validator trusts nothing the strategy computed: it re-derives lot
//! coverage, event geometry, window occupancy, and changeover pricing
//! from the event stream alone. Violations are findings, not errors; a
//! flawed schedule is still returned to the caller, flagged.

use std::collections::HashMap;

use domain::config::ScheduleConfig;
use domain::event::{EventKind, LineSchedule};
use domain::lot::LotSet;
use domain::schedule::{Schedule, UnscheduledLot, Violation, ViolationKind};

use crate::feasibility::changeover_secs;

/// Re-check a frozen schedule against the full invariant set.
/// Returns all findings, in deterministic order.
pub fn validate_schedule(
    schedule: &Schedule,
    lots: &LotSet,
    config: &ScheduleConfig,
) -> Vec<Violation> {
    validate(&schedule.lines, lots, config, &schedule.unscheduled)
}

/// Core check over raw line schedules, used both by [`validate_schedule`]
/// and by the strategy runner before freezing.
pub fn validate(
    lines: &[LineSchedule],
    lots: &LotSet,
    config: &ScheduleConfig,
    unscheduled: &[UnscheduledLot],
) -> Vec<Violation> {
    let mut violations = Vec::new();

    check_lot_coverage(lines, lots, unscheduled, &mut violations);
    for line in lines {
        check_event_geometry(line, &mut violations);
        check_cleans(line, config, &mut violations);
        check_windows(line, config, &mut violations);
        check_changeovers(line, config, &mut violations);
    }

    violations
}

/// Invariant 1: every input lot appears in exactly one fill event,
/// unless the strategy explicitly reported it unscheduled.
fn check_lot_coverage(
    lines: &[LineSchedule],
    lots: &LotSet,
    unscheduled: &[UnscheduledLot],
    violations: &mut Vec<Violation>,
) {
    let mut fills: HashMap<&str, (u32, u32, u64)> = HashMap::new();
    for line in lines {
        for event in &line.events {
            if event.kind == EventKind::Fill {
                if let Some(id) = event.lot_id.as_deref() {
                    let entry = fills.entry(id).or_insert((0, line.line_id, event.start));
                    entry.0 += 1;
                }
            }
        }
    }

    for lot in lots.iter() {
        match fills.get(lot.id.as_str()) {
            None => {
                if !unscheduled.iter().any(|u| u.lot_id == lot.id) {
                    violations.push(Violation {
                        kind: ViolationKind::MissingLot,
                        line_id: 0,
                        at: 0,
                        detail: format!("lot {} has no fill event", lot.id),
                    });
                }
            }
            Some((count, line_id, at)) if *count > 1 => {
                violations.push(Violation {
                    kind: ViolationKind::DuplicateFill,
                    line_id: *line_id,
                    at: *at,
                    detail: format!("lot {} is filled {count} times", lot.id),
                });
            }
            Some(_) => {}
        }
    }

    for (id, (_, line_id, at)) in &fills {
        if !lots.iter().any(|lot| lot.id == *id) {
            violations.push(Violation {
                kind: ViolationKind::UnknownLot,
                line_id: *line_id,
                at: *at,
                detail: format!("fill references lot {id} not in the input set"),
            });
        }
    }

    // HashMap iteration order is not stable; keep the output deterministic.
    violations.sort_by(|a, b| (a.line_id, a.at, &a.detail).cmp(&(b.line_id, b.at, &b.detail)));
}

/// Invariants 2 and 6: positive spans, no overlaps, no gaps.
fn check_event_geometry(line: &LineSchedule, violations: &mut Vec<Violation>) {
    for event in &line.events {
        if event.start >= event.end {
            violations.push(Violation {
                kind: ViolationKind::InvalidEventSpan,
                line_id: line.line_id,
                at: event.start,
                detail: format!(
                    "{:?} event spans [{}, {}]",
                    event.kind, event.start, event.end
                ),
            });
        }
    }

    for pair in line.events.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.start < prev.end {
            violations.push(Violation {
                kind: ViolationKind::OverlappingEvents,
                line_id: line.line_id,
                at: next.start,
                detail: format!(
                    "event starting at {} overlaps previous ending at {}",
                    next.start, prev.end
                ),
            });
        } else if next.start > prev.end {
            violations.push(Violation {
                kind: ViolationKind::GapBetweenEvents,
                line_id: line.line_id,
                at: prev.end,
                detail: format!(
                    "{}s of idle time between events; execution must be back-to-back",
                    next.start - prev.end
                ),
            });
        }
    }
}

/// Invariant 4: non-empty lines open with a clean, and every clean runs
/// for exactly the configured duration.
fn check_cleans(line: &LineSchedule, config: &ScheduleConfig, violations: &mut Vec<Violation>) {
    let Some(first) = line.events.first() else {
        return;
    };

    if first.kind != EventKind::Clean {
        violations.push(Violation {
            kind: ViolationKind::MissingOpeningClean,
            line_id: line.line_id,
            at: first.start,
            detail: format!("line {} opens with {:?}, not a clean", line.line_id, first.kind),
        });
    }

    for event in &line.events {
        if event.kind == EventKind::Clean && event.duration() != config.clean_secs() {
            violations.push(Violation {
                kind: ViolationKind::WrongCleanDuration,
                line_id: line.line_id,
                at: event.start,
                detail: format!(
                    "clean lasts {}s, expected {}s",
                    event.duration(),
                    config.clean_secs()
                ),
            });
        }
    }
}

/// Invariant 3: cumulative fill + changeover time between consecutive
/// cleans never exceeds the clean-window ceiling.
fn check_windows(line: &LineSchedule, config: &ScheduleConfig, violations: &mut Vec<Violation>) {
    let mut window_start: Option<u64> = None;
    let mut used = 0u64;

    for event in &line.events {
        match event.kind {
            EventKind::Clean => {
                flush_window(line, config, window_start, used, violations);
                window_start = Some(event.end);
                used = 0;
            }
            EventKind::Fill | EventKind::Changeover => {
                used += event.duration();
            }
        }
    }
    flush_window(line, config, window_start, used, violations);
}

fn flush_window(
    line: &LineSchedule,
    config: &ScheduleConfig,
    window_start: Option<u64>,
    used: u64,
    violations: &mut Vec<Violation>,
) {
    let Some(start) = window_start else { return };
    if used > config.window_secs() {
        violations.push(Violation {
            kind: ViolationKind::WindowOverrun,
            line_id: line.line_id,
            at: start,
            detail: format!(
                "window uses {used}s of fill+changeover, ceiling is {}s",
                config.window_secs()
            ),
        });
    }
}

/// Invariant 5: every changeover is priced by its declared transition.
fn check_changeovers(line: &LineSchedule, config: &ScheduleConfig, violations: &mut Vec<Violation>) {
    for event in &line.events {
        if event.kind != EventKind::Changeover {
            continue;
        }
        let (Some(from), Some(to)) = (event.from_type.as_deref(), event.to_type.as_deref())
        else {
            violations.push(Violation {
                kind: ViolationKind::WrongChangeoverDuration,
                line_id: line.line_id,
                at: event.start,
                detail: "changeover is missing its type transition".into(),
            });
            continue;
        };

        let expected = changeover_secs(Some(from), to, config);
        if event.duration() != expected {
            violations.push(Violation {
                kind: ViolationKind::WrongChangeoverDuration,
                line_id: line.line_id,
                at: event.start,
                detail: format!(
                    "changeover {from}->{to} lasts {}s, expected {expected}s",
                    event.duration()
                ),
            });
        }
    }
}
