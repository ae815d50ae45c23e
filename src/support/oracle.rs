//! Convex-program oracle abstraction.
//!
//! The successive-approximation driver treats the convex solver as an opaque
//! oracle: it submits a fully-posynomial [`GpProgram`] and receives either
//! the global optimum of that (convex, after log-transform) program or an
//! infeasibility/unboundedness signal. Any solver satisfying [`ConvexOracle`]
//! is substitutable; [`ClarabelOracle`] is the packaged backend.

mod clarabel;

pub use self::clarabel::{ClarabelOracle, OracleSettings};

use thiserror::Error;

use crate::support::gp::GpProgram;

/// An opaque solver for posynomial programs.
pub trait ConvexOracle {
    /// Solves the program to global optimality.
    ///
    /// # Errors
    ///
    /// Returns an [`OracleError`] when no feasible point exists, the program
    /// is unbounded below, or the solver fails numerically.
    fn solve(&self, program: &GpProgram) -> Result<OracleSolution, OracleError>;
}

/// The optimal assignment returned by an oracle.
#[derive(Debug, Clone)]
pub struct OracleSolution {
    /// One positive value per free-variable column of the program.
    pub x: Vec<f64>,
    /// The program objective evaluated at `x`.
    pub objective: f64,
}

/// Terminal outcomes of a single oracle invocation.
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    #[error("the relaxed program has no feasible point")]
    Infeasible,

    #[error("the relaxed program is unbounded below")]
    Unbounded,

    #[error("the solver terminated abnormally: {status}")]
    Numerical { status: String },
}
