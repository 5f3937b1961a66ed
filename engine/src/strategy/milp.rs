//! Exact optimization strategy.
//!
//! Builds the schedule as a structured MILP — binary assignment
//! `x[lot,line,slot]`, window-break binaries `y[line,slot]`, and
//! equality-propagated continuous start/changeover/window-usage
//! variables — and hands it to the abstract [`Solver`]. Because events
//! run back-to-back, all times are fully determined once the binaries
//! are fixed; the decoder therefore rebuilds the event sequence from the
//! assignment with exact integer arithmetic instead of trusting solver
//! floats.

use domain::config::ScheduleConfig;
use domain::error::EngineError;
use domain::lot::LotSet;

use crate::feasibility::{InsertionDecision, changeover_secs, processing_secs};
use crate::solver::{Assignment, CmpOp, MilpProblem, SolveStatus, Solver, SolverError};

use super::{BuiltSchedule, Deadline, fresh_lines};

/// Index bookkeeping between the formulation and the decoder. The
/// solver never sees this; it works on the flat variable list.
pub(crate) struct VarLayout {
    n_lots: usize,
    n_lines: usize,
    x_base: usize,
    y_base: usize,
}

impl VarLayout {
    /// `x[lot, line, slot]`: lot scheduled in that slot of that line.
    fn x(&self, lot: usize, line: usize, slot: usize) -> usize {
        self.x_base + (lot * self.n_lines + line) * self.n_lots + slot
    }

    /// `y[line, slot]`: clean break before `slot` (slot >= 1; slot 0
    /// always opens with a clean).
    fn y(&self, line: usize, slot: usize) -> usize {
        debug_assert!(slot >= 1);
        self.y_base + line * (self.n_lots - 1) + (slot - 1)
    }
}

pub(crate) fn run(
    lots: &LotSet,
    config: &ScheduleConfig,
    deadline: Deadline,
    solver: &dyn Solver,
) -> Result<BuiltSchedule, EngineError> {
    let (problem, layout) = formulate(lots, config);

    let outcome = solver
        .solve(&problem, deadline.remaining())
        .map_err(|error| match error {
            SolverError::Unavailable(detail) => EngineError::SolverUnavailable { detail },
            SolverError::Malformed(detail) => EngineError::Internal { detail },
        })?;

    match outcome.status {
        SolveStatus::Optimal | SolveStatus::Feasible => {
            let assignment = outcome.assignment.ok_or_else(|| EngineError::Internal {
                detail: "solver reported success without an assignment".into(),
            })?;
            Ok(decode(
                &assignment,
                &layout,
                lots,
                config,
                outcome.status == SolveStatus::Feasible,
            ))
        }
        SolveStatus::Infeasible => Err(EngineError::SolverInfeasible {
            detail: format!(
                "{} lots on {} lines with a {}s window",
                lots.len(),
                config.num_lines,
                config.window_secs()
            ),
        }),
        SolveStatus::Timeout => Err(EngineError::TimeoutNoIncumbent),
    }
}

/// Build the MILP. Constraint groups, in emission order:
/// 1. each lot assigned exactly once,
/// 2. at most one lot per slot,
/// 3. no empty slot before a used one,
/// 4. per line and slot: changeover pricing, start-time recursion,
///    window-usage recursion, and the window ceiling,
/// 5. makespan bounds over used slots.
pub(crate) fn formulate(lots: &LotSet, config: &ScheduleConfig) -> (MilpProblem, VarLayout) {
    let n = lots.len();
    let m = config.num_lines as usize;

    let processing: Vec<u64> = lots
        .iter()
        .map(|lot| processing_secs(lot, config))
        .collect();
    let clean = config.clean_secs() as f64;
    let window = config.window_secs() as f64;
    let max_changeover = config
        .changeover_same_secs()
        .max(config.changeover_diff_secs()) as f64;

    // Horizon: every lot in its own window, changeovers included.
    let horizon: f64 = clean
        + processing
            .iter()
            .map(|p| *p as f64 + clean + max_changeover)
            .sum::<f64>();
    let window_big = 2.0 * window + max_changeover;

    let mut problem = MilpProblem::minimize();
    let layout = VarLayout {
        n_lots: n,
        n_lines: m,
        x_base: 0,
        y_base: n * m * n,
    };

    for lot in 0..n {
        for line in 0..m {
            for slot in 0..n {
                problem.add_binary(format!("x[{lot},{line},{slot}]"));
            }
        }
    }
    for line in 0..m {
        for slot in 1..n {
            problem.add_binary(format!("y[{line},{slot}]"));
        }
    }

    let mut start: Vec<Vec<usize>> = vec![Vec::new(); m];
    let mut usage: Vec<Vec<usize>> = vec![Vec::new(); m];
    let mut co: Vec<Vec<usize>> = vec![Vec::new(); m];
    for line in 0..m {
        for slot in 0..n {
            start[line]
                .push(problem.add_continuous(format!("start[{line},{slot}]"), 0.0, horizon));
        }
        for slot in 0..n {
            usage[line].push(problem.add_continuous(format!("u[{line},{slot}]"), 0.0, window));
        }
        for slot in 1..n {
            co[line]
                .push(problem.add_continuous(format!("co[{line},{slot}]"), 0.0, max_changeover));
        }
    }
    let makespan = problem.add_continuous("makespan", 0.0, horizon);

    for lot in 0..n {
        let mut terms = Vec::with_capacity(m * n);
        for line in 0..m {
            for slot in 0..n {
                terms.push((1.0, layout.x(lot, line, slot)));
            }
        }
        problem.add_constraint(format!("assign[{lot}]"), terms, CmpOp::Eq, 1.0);
    }

    for line in 0..m {
        for slot in 0..n {
            let terms: Vec<(f64, usize)> =
                (0..n).map(|lot| (1.0, layout.x(lot, line, slot))).collect();
            problem.add_constraint(format!("occupancy[{line},{slot}]"), terms, CmpOp::Le, 1.0);
        }
    }

    for line in 0..m {
        for slot in 1..n {
            let mut terms: Vec<(f64, usize)> = Vec::with_capacity(2 * n);
            for lot in 0..n {
                terms.push((1.0, layout.x(lot, line, slot)));
                terms.push((-1.0, layout.x(lot, line, slot - 1)));
            }
            problem.add_constraint(format!("no_gap[{line},{slot}]"), terms, CmpOp::Le, 0.0);
        }
    }

    let lot_types: Vec<&str> = lots.iter().map(|lot| lot.product_type.as_str()).collect();

    for line in 0..m {
        // Slot 0 opens with the mandatory clean.
        problem.add_constraint(
            format!("open_clean[{line}]"),
            vec![(1.0, start[line][0])],
            CmpOp::Ge,
            clean,
        );
        {
            let mut terms = vec![(1.0, usage[line][0])];
            for lot in 0..n {
                terms.push((-(processing[lot] as f64), layout.x(lot, line, 0)));
            }
            problem.add_constraint(format!("u_init[{line}]"), terms, CmpOp::Ge, 0.0);
        }
        problem.add_constraint(
            format!("window_cap[{line},0]"),
            vec![(1.0, usage[line][0])],
            CmpOp::Le,
            window,
        );

        for slot in 1..n {
            let co_var = co[line][slot - 1];
            let y_var = layout.y(line, slot);

            // Changeover pricing: when prev holds `a` and this slot
            // holds `b` with no break in between, co >= cost(a -> b).
            for prev in 0..n {
                for next in 0..n {
                    if prev == next {
                        continue;
                    }
                    let cost =
                        changeover_secs(Some(lot_types[prev]), lot_types[next], config) as f64;
                    if cost == 0.0 {
                        continue;
                    }
                    problem.add_constraint(
                        format!("co[{line},{slot},{prev},{next}]"),
                        vec![
                            (1.0, co_var),
                            (-cost, layout.x(prev, line, slot - 1)),
                            (-cost, layout.x(next, line, slot)),
                            (max_changeover, y_var),
                        ],
                        CmpOp::Ge,
                        -cost,
                    );
                }
            }

            // Back-to-back start times: previous fill, then either the
            // changeover or a clean when the window breaks.
            {
                let mut terms = vec![
                    (1.0, start[line][slot]),
                    (-1.0, start[line][slot - 1]),
                    (-1.0, co_var),
                    (-clean, y_var),
                ];
                for lot in 0..n {
                    terms.push((-(processing[lot] as f64), layout.x(lot, line, slot - 1)));
                }
                problem.add_constraint(format!("seq[{line},{slot}]"), terms, CmpOp::Ge, 0.0);
            }

            // Window usage carries over unless a break resets it.
            {
                let mut terms = vec![
                    (1.0, usage[line][slot]),
                    (-1.0, usage[line][slot - 1]),
                    (-1.0, co_var),
                    (window_big, y_var),
                ];
                for lot in 0..n {
                    terms.push((-(processing[lot] as f64), layout.x(lot, line, slot)));
                }
                problem.add_constraint(format!("u_carry[{line},{slot}]"), terms, CmpOp::Ge, 0.0);
            }
            {
                let mut terms = vec![(1.0, usage[line][slot])];
                for lot in 0..n {
                    terms.push((-(processing[lot] as f64), layout.x(lot, line, slot)));
                }
                problem.add_constraint(format!("u_fresh[{line},{slot}]"), terms, CmpOp::Ge, 0.0);
            }
            problem.add_constraint(
                format!("window_cap[{line},{slot}]"),
                vec![(1.0, usage[line][slot])],
                CmpOp::Le,
                window,
            );
        }
    }

    // Makespan covers the end of every used slot; unused slots are
    // relaxed away by the horizon term.
    for line in 0..m {
        for slot in 0..n {
            let mut terms = vec![(1.0, makespan), (-1.0, start[line][slot])];
            for lot in 0..n {
                terms.push((-(processing[lot] as f64 + horizon), layout.x(lot, line, slot)));
            }
            problem.add_constraint(
                format!("makespan[{line},{slot}]"),
                terms,
                CmpOp::Ge,
                -horizon,
            );
        }
    }

    problem.objective.terms = vec![(1.0, makespan)];

    (problem, layout)
}

/// Rebuild the event sequence from a solver assignment, honoring the
/// solver's window-break choices. All times are recomputed with exact
/// integer arithmetic.
fn decode(
    assignment: &Assignment,
    layout: &VarLayout,
    lots: &LotSet,
    config: &ScheduleConfig,
    timed_out: bool,
) -> BuiltSchedule {
    let mut lines = fresh_lines(config);

    for line in 0..layout.n_lines {
        for slot in 0..layout.n_lots {
            let Some(lot_index) =
                (0..layout.n_lots).find(|&lot| assignment.is_set(layout.x(lot, line, slot)))
            else {
                break; // no-gap: the rest of this line is empty
            };
            let lot = &lots.lots()[lot_index];

            let break_before = slot == 0 || assignment.is_set(layout.y(line, slot));
            let decision = if break_before {
                InsertionDecision::CloseAndReopen {
                    clean_secs: config.clean_secs(),
                }
            } else {
                let state = &lines[line];
                InsertionDecision::AppendInWindow {
                    changeover_secs: changeover_secs(
                        state.window().and_then(|w| w.last_type.as_deref()),
                        &lot.product_type,
                        config,
                    ),
                }
            };
            lines[line].apply(lot, &decision, config);
        }
    }

    BuiltSchedule {
        lines,
        unscheduled: Vec::new(),
        timed_out,
    }
}
