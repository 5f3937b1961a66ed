use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Input-time rejection: the caller handed us something that can never
/// be scheduled. Carries the offending field and value so the façade can
/// point at the bad row.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{field}: {message} (got `{value}`)")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub value: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: value.into(),
        }
    }
}

/// Runtime failure inside the engine, after input validation passed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("input validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// No solver backend is available for the `milp` strategy.
    #[error("no solver is available for the milp strategy: {detail}")]
    SolverUnavailable { detail: String },

    /// The solver reported infeasible for input that passed validation.
    /// Validated input always has a feasible schedule, so this is a bug
    /// surface, not a user error.
    #[error("solver reported infeasible for validated input: {detail}")]
    SolverInfeasible { detail: String },

    /// The strategy deadline expired before any feasible schedule existed.
    #[error("strategy deadline expired with no feasible incumbent")]
    TimeoutNoIncumbent,

    #[error("internal invariant breach: {detail}")]
    Internal { detail: String },
}

impl EngineError {
    /// Stable machine-readable error kind, for the serialized contract.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::SolverUnavailable { .. } => "solver_unavailable",
            EngineError::SolverInfeasible { .. } => "solver_infeasible",
            EngineError::TimeoutNoIncumbent => "timeout_no_incumbent",
            EngineError::Internal { .. } => "internal",
        }
    }
}

impl Serialize for EngineError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("EngineError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("detail", &self.to_string())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_serializes_kind_and_detail() {
        let err = EngineError::SolverInfeasible {
            detail: "no assignment".into(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "solver_infeasible");
        assert!(json["detail"].as_str().unwrap().contains("no assignment"));
    }

    #[test]
    fn validation_error_display_includes_field_and_value() {
        let err = ValidationError::new("vials", "must be positive", "0");
        assert_eq!(err.to_string(), "vials: must be positive (got `0`)");
    }
}
