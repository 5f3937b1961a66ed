//! Pluggable MILP solving capability.
//!
//! The engine describes its optimization problem as data — variables,
//! linear constraints, an objective — and hands it to a [`Solver`]. It
//! never links a solver library into its own logic, so the formulation
//! is testable with a stub and production deployments can substitute a
//! commercial backend. A small exact [`branch_bound`] solver ships as
//! the default so the `milp` strategy works out of the box.

pub mod branch_bound;

use std::time::Duration;

use thiserror::Error;

pub use branch_bound::BranchBoundSolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    Continuous,
}

/// One decision variable with its box bounds.
#[derive(Debug, Clone)]
pub struct VarDef {
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Le,
    Ge,
    Eq,
}

/// A linear constraint `sum(coef * var) op rhs`. Terms reference
/// variables by index into [`MilpProblem::vars`].
#[derive(Debug, Clone)]
pub struct Constraint {
    pub name: String,
    pub terms: Vec<(f64, usize)>,
    pub op: CmpOp,
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

#[derive(Debug, Clone)]
pub struct Objective {
    pub sense: Sense,
    pub terms: Vec<(f64, usize)>,
}

/// A structured MILP: pure data, no solver state.
#[derive(Debug, Clone)]
pub struct MilpProblem {
    pub vars: Vec<VarDef>,
    pub constraints: Vec<Constraint>,
    pub objective: Objective,
}

impl MilpProblem {
    pub fn minimize() -> Self {
        Self {
            vars: Vec::new(),
            constraints: Vec::new(),
            objective: Objective {
                sense: Sense::Minimize,
                terms: Vec::new(),
            },
        }
    }

    pub fn add_binary(&mut self, name: impl Into<String>) -> usize {
        self.add_var(name, VarKind::Binary, 0.0, 1.0)
    }

    pub fn add_continuous(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> usize {
        self.add_var(name, VarKind::Continuous, lower, upper)
    }

    fn add_var(&mut self, name: impl Into<String>, kind: VarKind, lower: f64, upper: f64) -> usize {
        self.vars.push(VarDef {
            name: name.into(),
            kind,
            lower,
            upper,
        });
        self.vars.len() - 1
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(f64, usize)>,
        op: CmpOp,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            terms,
            op,
            rhs,
        });
    }

    pub fn num_binary(&self) -> usize {
        self.vars
            .iter()
            .filter(|v| v.kind == VarKind::Binary)
            .count()
    }
}

/// Terminal state of a solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Search exhausted; the assignment is provably optimal.
    Optimal,
    /// Time limit hit with a feasible incumbent in hand.
    Feasible,
    /// Search exhausted without finding any feasible assignment.
    Infeasible,
    /// Time limit hit before any feasible assignment was found.
    Timeout,
}

/// Values for every variable, indexed like [`MilpProblem::vars`].
#[derive(Debug, Clone)]
pub struct Assignment {
    pub values: Vec<f64>,
}

impl Assignment {
    /// Read a binary variable as a bool (values are 0.0 or 1.0).
    pub fn is_set(&self, var: usize) -> bool {
        self.values[var] > 0.5
    }
}

#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub assignment: Option<Assignment>,
    pub objective: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("solver backend unavailable: {0}")]
    Unavailable(String),
    #[error("malformed problem: {0}")]
    Malformed(String),
}

/// The capability boundary: anything that can execute a [`MilpProblem`]
/// under a wallclock budget. Owned per strategy run; implementations
/// must not share mutable state across calls.
pub trait Solver: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(
        &self,
        problem: &MilpProblem,
        time_limit: Duration,
    ) -> Result<SolveOutcome, SolverError>;
}
