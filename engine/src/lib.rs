//! Fill-lot scheduling engine.
//!
//! Responsibilities:
//! - Feasibility kernel: clean-window accounting and admission decisions
//!   shared by every strategy (`feasibility`, `line`).
//! - Strategies: greedy dispatchers (LPT/SPT/CFS), type-grouped packing
//!   (SmartPack/Hybrid), and an exact MILP formulation behind a pluggable
//!   solver (`strategy`, `solver`).
//! - Independent re-validation of produced schedules (`validator`) and
//!   aggregate quality metrics (`metrics`).
//! - Side-by-side comparison of strategies with per-run deadlines
//!   (`compare`).
//!
//! Non-responsibilities:
//! - Input ingestion (CSV, HTTP); callers hand over a validated `LotSet`.
//! - Persistence of schedules or comparison reports.
//! - Wall-clock formatting; all times are seconds from `start_time`.

pub mod compare;
pub mod feasibility;
pub mod line;
pub mod metrics;
pub mod solver;
pub mod strategy;
pub mod validator;

pub use compare::compare;
pub use strategy::{schedule, schedule_with_solver};
