use thiserror::Error;

use crate::support::gp::{DesignPoint, LowerError};
use crate::support::sca::ScaError;

/// Errors that abort a design solve.
///
/// Every abort path carries enough state to diagnose the failure; warnings
/// that do not abort are [`ModelingWarning`]s attached to the result instead.
#[derive(Debug, Error)]
pub enum DesignError {
    /// Rejected before any solve is attempted.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The inputs over-constrain the model: no feasible point exists for the
    /// very first relaxation. Structural, not transient.
    #[error("design is infeasible as posed; no feasible point at the initial relaxation")]
    Infeasible { initial: Box<DesignPoint> },

    /// A feasible point existed at iteration 0 but the relaxation sequence
    /// later lost feasibility, usually from a poor warm start.
    #[error("relaxation sequence diverged at iteration {iteration}")]
    RelaxationDiverged {
        iteration: u32,
        last_feasible: Box<DesignPoint>,
    },

    /// The oracle failed for a reason other than infeasibility.
    #[error("solver failure at iteration {iteration}: {status}")]
    Solver { iteration: u32, status: String },
}

impl From<ScaError> for DesignError {
    fn from(err: ScaError) -> Self {
        match err {
            ScaError::Infeasible { initial } => Self::Infeasible { initial },
            ScaError::RelaxationDiverged {
                iteration,
                last_feasible,
            } => Self::RelaxationDiverged {
                iteration,
                last_feasible,
            },
            ScaError::Unbounded { iteration } => Self::Solver {
                iteration,
                status: "relaxed program unbounded".to_string(),
            },
            ScaError::Numerical { iteration, status } => Self::Solver { iteration, status },
            ScaError::Lower(e @ LowerError::Signomial { .. }) => Self::Solver {
                iteration: 0,
                status: e.to_string(),
            },
            ScaError::Lower(e) => Self::InvalidInput {
                reason: e.to_string(),
            },
        }
    }
}

/// Non-fatal findings attached to an otherwise usable solution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelingWarning {
    /// A solved quantity sits outside the validated domain of the empirical
    /// fit that produced it; the solution is returned but the affected
    /// correlations are extrapolating.
    #[error("{variable} = {value:.4e} outside the fitted range [{lower:.4e}, {upper:.4e}]")]
    CorrelationOutOfRange {
        variable: String,
        value: f64,
        lower: f64,
        upper: f64,
    },
}
