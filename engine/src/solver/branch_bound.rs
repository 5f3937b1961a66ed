//! Bundled exact solver: depth-first branch-and-bound over the binary
//! variables with bound propagation for the continuous ones.
//!
//! Scope: problems in the shape the engine's `formulate` emits —
//! - binaries drive the combinatorics; pure-binary constraints are used
//!   for pruning during the descent;
//! - each continuous variable is lower-bounded by `Ge` constraints whose
//!   first term is that variable with coefficient +1, emitted before any
//!   constraint that reads it, so a single forward pass computes the
//!   tight value once the binaries are fixed;
//! - every constraint is re-checked against the final values, so a
//!   problem outside this shape fails closed (infeasible leaf), never
//!   silently wrong.
//!
//! Deterministic: fixed branching order (variable definition order,
//! value 1 before 0), strict improvement to replace the incumbent.

use std::time::{Duration, Instant};

use tracing::debug;

use super::{
    Assignment, CmpOp, MilpProblem, Sense, SolveOutcome, SolveStatus, Solver, SolverError, VarKind,
};

const EPS: f64 = 1e-6;

/// How often (in nodes) the deadline is polled.
const DEADLINE_STRIDE: u64 = 64;

#[derive(Debug, Clone)]
pub struct BranchBoundSolver {
    /// Hard cap on explored nodes; treated like a time limit when hit.
    pub node_limit: u64,
}

impl Default for BranchBoundSolver {
    fn default() -> Self {
        Self {
            node_limit: 2_000_000,
        }
    }
}

impl Solver for BranchBoundSolver {
    fn name(&self) -> &'static str {
        "branch-bound"
    }

    fn solve(
        &self,
        problem: &MilpProblem,
        time_limit: Duration,
    ) -> Result<SolveOutcome, SolverError> {
        if problem.objective.sense == Sense::Maximize {
            return Err(SolverError::Malformed(
                "branch-bound only minimizes".into(),
            ));
        }
        for constraint in &problem.constraints {
            for (_, var) in &constraint.terms {
                if *var >= problem.vars.len() {
                    return Err(SolverError::Malformed(format!(
                        "constraint {} references unknown variable {var}",
                        constraint.name
                    )));
                }
            }
        }

        let mut search = Search::new(problem, self.node_limit, Instant::now() + time_limit);
        search.dive(0);

        let status = match (&search.incumbent, search.out_of_budget) {
            (Some(_), false) => SolveStatus::Optimal,
            (Some(_), true) => SolveStatus::Feasible,
            (None, false) => SolveStatus::Infeasible,
            (None, true) => SolveStatus::Timeout,
        };

        debug!(
            solver = self.name(),
            nodes = search.nodes,
            ?status,
            objective = search.incumbent_obj,
            "solve finished"
        );

        Ok(SolveOutcome {
            status,
            objective: search.incumbent.as_ref().map(|_| search.incumbent_obj),
            assignment: search.incumbent.map(|values| Assignment { values }),
        })
    }
}

struct Search<'a> {
    problem: &'a MilpProblem,
    /// Indices of binary variables, in branching order.
    binaries: Vec<usize>,
    /// Constraints whose every term is a binary variable.
    pure_binary: Vec<bool>,
    values: Vec<f64>,
    assigned: Vec<bool>,
    incumbent: Option<Vec<f64>>,
    incumbent_obj: f64,
    nodes: u64,
    node_limit: u64,
    deadline: Instant,
    out_of_budget: bool,
}

impl<'a> Search<'a> {
    fn new(problem: &'a MilpProblem, node_limit: u64, deadline: Instant) -> Self {
        let binaries = problem
            .vars
            .iter()
            .enumerate()
            .filter(|(_, v)| v.kind == VarKind::Binary)
            .map(|(i, _)| i)
            .collect();
        let pure_binary = problem
            .constraints
            .iter()
            .map(|c| {
                c.terms
                    .iter()
                    .all(|(_, var)| problem.vars[*var].kind == VarKind::Binary)
            })
            .collect();

        Self {
            problem,
            binaries,
            pure_binary,
            values: problem.vars.iter().map(|v| v.lower).collect(),
            assigned: vec![false; problem.vars.len()],
            incumbent: None,
            incumbent_obj: f64::INFINITY,
            nodes: 0,
            node_limit,
            deadline,
            out_of_budget: false,
        }
    }

    fn dive(&mut self, depth: usize) {
        if self.out_of_budget {
            return;
        }
        self.nodes += 1;
        if self.nodes > self.node_limit
            || ((self.nodes - 1) % DEADLINE_STRIDE == 0 && Instant::now() >= self.deadline)
        {
            self.out_of_budget = true;
            return;
        }

        if depth == self.binaries.len() {
            self.evaluate_leaf();
            return;
        }

        let var = self.binaries[depth];
        self.assigned[var] = true;
        for candidate in [1.0, 0.0] {
            self.values[var] = candidate;
            if self.binary_bounds_hold() {
                self.dive(depth + 1);
            }
            if self.out_of_budget {
                break;
            }
        }
        self.assigned[var] = false;
        self.values[var] = self.problem.vars[var].lower;
    }

    /// Prune on pure-binary constraints: with the current partial
    /// assignment, can the constraint still be satisfied by the
    /// unassigned binaries?
    fn binary_bounds_hold(&self) -> bool {
        for (constraint, pure) in self.problem.constraints.iter().zip(&self.pure_binary) {
            if !pure {
                continue;
            }
            let mut fixed = 0.0;
            let mut min_add = 0.0;
            let mut max_add = 0.0;
            for (coef, var) in &constraint.terms {
                if self.assigned[*var] {
                    fixed += coef * self.values[*var];
                } else {
                    min_add += coef.min(0.0);
                    max_add += coef.max(0.0);
                }
            }
            let feasible = match constraint.op {
                CmpOp::Le => fixed + min_add <= constraint.rhs + EPS,
                CmpOp::Ge => fixed + max_add >= constraint.rhs - EPS,
                CmpOp::Eq => {
                    fixed + min_add <= constraint.rhs + EPS
                        && fixed + max_add >= constraint.rhs - EPS
                }
            };
            if !feasible {
                return false;
            }
        }
        true
    }

    /// All binaries fixed: propagate the continuous lower bounds in
    /// constraint order, then re-check everything and compare against
    /// the incumbent.
    fn evaluate_leaf(&mut self) {
        for (i, var) in self.problem.vars.iter().enumerate() {
            if var.kind == VarKind::Continuous {
                self.values[i] = var.lower;
            }
        }

        for constraint in &self.problem.constraints {
            if constraint.op != CmpOp::Ge {
                continue;
            }
            let Some((lead_coef, lead_var)) = constraint.terms.first().copied() else {
                continue;
            };
            if self.problem.vars[lead_var].kind != VarKind::Continuous
                || (lead_coef - 1.0).abs() > EPS
            {
                continue;
            }
            let rest: f64 = constraint.terms[1..]
                .iter()
                .map(|(coef, var)| coef * self.values[*var])
                .sum();
            let bound = constraint.rhs - rest;
            if bound > self.values[lead_var] {
                self.values[lead_var] = bound;
            }
        }

        for constraint in &self.problem.constraints {
            let lhs: f64 = constraint
                .terms
                .iter()
                .map(|(coef, var)| coef * self.values[*var])
                .sum();
            let holds = match constraint.op {
                CmpOp::Le => lhs <= constraint.rhs + EPS,
                CmpOp::Ge => lhs >= constraint.rhs - EPS,
                CmpOp::Eq => (lhs - constraint.rhs).abs() <= EPS,
            };
            if !holds {
                return;
            }
        }
        for (i, var) in self.problem.vars.iter().enumerate() {
            if self.values[i] > var.upper + EPS || self.values[i] < var.lower - EPS {
                return;
            }
        }

        let objective: f64 = self
            .problem
            .objective
            .terms
            .iter()
            .map(|(coef, var)| coef * self.values[*var])
            .sum();

        if objective < self.incumbent_obj - EPS {
            self.incumbent_obj = objective;
            self.incumbent = Some(self.values.clone());
        }
    }
}
