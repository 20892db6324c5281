use std::time::Duration;

use thiserror::Error;

use crate::structs::trajectory::Trajectory;

/// Errors returned by the simulation core.
///
/// [SimulationError::InvalidParameter] means the inputs were rejected before any
/// integration step was taken; [SimulationError::IntegrationFailure] means the
/// solver started but could not reach the end of the requested time span.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("integration failed at t = {time}: {reason}")]
    IntegrationFailure {
        /// Last time the solver successfully reached.
        time: f64,
        reason: FailureReason,
        /// Samples computed before the failure.
        partial: Box<Trajectory>,
    },
}

impl SimulationError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SimulationError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors caused by the inputs rather than by the solver.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, SimulationError::InvalidParameter { .. })
    }

    /// Partial trajectory of a failed integration, if any.
    pub fn partial(&self) -> Option<&Trajectory> {
        match self {
            SimulationError::IntegrationFailure { partial, .. } => Some(partial),
            SimulationError::InvalidParameter { .. } => None,
        }
    }
}

/// Why the solver stopped before the end of the time span.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FailureReason {
    /// Error reported by the Dormand-Prince stepper (step size underflow, step
    /// count exhausted, stiffness detected).
    #[error("solver error: {0}")]
    Solver(String),

    #[error("state became non-finite")]
    NonFiniteState,

    #[error("exceeded the limit of {0} accepted steps")]
    StepLimit(usize),

    #[error("exceeded the wall-clock limit of {0:?}")]
    TimeLimit(Duration),
}

/// Checks that `value` is finite, returning an [SimulationError::InvalidParameter] otherwise.
pub(crate) fn ensure_finite(name: &'static str, value: f64) -> Result<f64, SimulationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimulationError::invalid(
            name,
            format!("must be finite (got {})", value),
        ))
    }
}
