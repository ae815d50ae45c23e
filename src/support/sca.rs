//! Successive convex approximation driver.
//!
//! The driver solves a constraint set containing a small number of
//! signomial relations by iterating convex solves: at each step every
//! signomial's multi-term side is replaced with its local monomial fit
//! about the current candidate, the resulting posynomial program is handed
//! to the oracle, and the returned optimum becomes the next candidate.
//!
//! Because the monomial fit never exceeds the posynomial it approximates,
//! every relaxed program is a restriction of the true feasible set: each
//! accepted iterate is genuinely feasible, and the restriction tightens to
//! exactness as the sequence approaches a fixed point. For the heat-balance
//! coupling this model family carries, that fixed point is typically
//! reached in a handful of iterations.

mod cache;

pub use cache::{params_hash, CacheKey, WarmStartCache};

use std::collections::BTreeMap;

use thiserror::Error;

use crate::support::gp::{
    lower, Constraint, ConstraintClass, DesignPoint, LowerError, Posynomial, Var, VarTable,
};
use crate::support::oracle::{ConvexOracle, OracleError};

/// Tuning knobs for the refinement loop.
#[derive(Debug, Clone)]
pub struct ScaConfig {
    /// Relative objective change below which the sequence has converged.
    pub rel_tol: f64,
    /// Hard cap on oracle solves before returning `NotConverged`.
    pub max_iters: u32,
    /// Retry a failed relaxation once from the log-space midpoint of the
    /// last two candidates before declaring divergence.
    pub damped_restart: bool,
}

impl Default for ScaConfig {
    fn default() -> Self {
        Self {
            rel_tol: 1e-4,
            max_iters: 40,
            damped_restart: true,
        }
    }
}

/// Whether the returned point is a fixed point of the refinement loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaStatus {
    Converged,
    /// The iteration cap was reached; the best-known point is returned but
    /// must not be treated as optimal.
    NotConverged,
}

/// The outcome of a successful (possibly non-converged) drive.
#[derive(Debug, Clone)]
pub struct ScaSolution {
    /// Final candidate over every table variable, substituted ones included.
    pub point: DesignPoint,
    /// Model objective evaluated at the final candidate.
    pub objective: f64,
    /// Number of oracle solves performed.
    pub iterations: u32,
    pub status: ScaStatus,
}

/// Abort paths of the refinement loop.
///
/// Every variant carries enough state to diagnose the failure: the iteration
/// index and the last point known to satisfy the true constraint set.
#[derive(Debug, Error)]
pub enum ScaError {
    /// The very first relaxation has no feasible point. This is structural:
    /// the inputs over-constrain the model independently of approximation.
    #[error("no feasible point exists for the initial relaxation")]
    Infeasible { initial: Box<DesignPoint> },

    /// A later relaxation lost feasibility, which usually indicates a poor
    /// warm start or too wide a signomial gap.
    #[error("relaxation sequence lost feasibility at iteration {iteration}")]
    RelaxationDiverged {
        iteration: u32,
        last_feasible: Box<DesignPoint>,
    },

    #[error("the relaxed program is unbounded at iteration {iteration}")]
    Unbounded { iteration: u32 },

    #[error("oracle failure at iteration {iteration}: {status}")]
    Numerical { iteration: u32, status: String },

    #[error(transparent)]
    Lower(LowerError),
}

/// Drives the relaxation sequence to a locally optimal feasible point.
///
/// `substitutions` fixes parameter variables; `warm_start`, when given,
/// seeds the candidate instead of the schema's initial guesses.
///
/// # Errors
///
/// See [`ScaError`]. Reaching the iteration cap is not an error: the result
/// comes back tagged [`ScaStatus::NotConverged`].
pub fn solve(
    table: &VarTable,
    objective: &Posynomial,
    constraints: &[Constraint],
    substitutions: &BTreeMap<Var, f64>,
    warm_start: Option<&DesignPoint>,
    oracle: &impl ConvexOracle,
    config: &ScaConfig,
) -> Result<ScaSolution, ScaError> {
    let (posy, signo): (Vec<&Constraint>, Vec<&Constraint>) = constraints
        .iter()
        .partition(|c| c.class() == ConstraintClass::Posynomial);

    let mut point = warm_start.cloned().unwrap_or_else(|| table.initial_point());
    for (&var, &value) in substitutions {
        point.set(var, value);
    }

    let mut previous: Option<DesignPoint> = None;
    let mut last_objective = f64::NAN;
    let mut damped = false;

    for iteration in 0..config.max_iters {
        let relaxed: Vec<Constraint> = posy
            .iter()
            .map(|c| (*c).clone())
            .chain(signo.iter().map(|c| c.monomialized(&point)))
            .collect();

        let lowered = lower(table, objective, &relaxed, substitutions);
        let (program, map) = match lowered {
            Ok(ok) => ok,
            Err(LowerError::TriviallyInfeasible { .. }) if iteration == 0 => {
                return Err(ScaError::Infeasible {
                    initial: Box::new(point),
                });
            }
            Err(LowerError::TriviallyInfeasible { .. }) => {
                return Err(ScaError::RelaxationDiverged {
                    iteration,
                    last_feasible: Box::new(point),
                });
            }
            Err(e) => return Err(ScaError::Lower(e)),
        };

        match oracle.solve(&program) {
            Ok(solution) => {
                let mut next = point.clone();
                for (col, &value) in solution.x.iter().enumerate() {
                    next.set(map.var_of(col), value);
                }
                let objective_value = objective.eval(&next);

                let converged = iteration > 0
                    && relative_change(objective_value, last_objective) <= config.rel_tol;
                previous = Some(std::mem::replace(&mut point, next));
                last_objective = objective_value;

                if converged {
                    return Ok(ScaSolution {
                        point,
                        objective: objective_value,
                        iterations: iteration + 1,
                        status: ScaStatus::Converged,
                    });
                }
            }
            Err(OracleError::Infeasible) => {
                if iteration == 0 {
                    return Err(ScaError::Infeasible {
                        initial: Box::new(point),
                    });
                }
                // The current candidate came out of a feasible solve, so it
                // satisfies the true constraint set; step halfway back toward
                // the previous candidate and retry once.
                if config.damped_restart && !damped {
                    damped = true;
                    let prev = previous.as_ref().expect("iteration > 0 has a predecessor");
                    point = DesignPoint::log_midpoint(prev, &point);
                    continue;
                }
                return Err(ScaError::RelaxationDiverged {
                    iteration,
                    last_feasible: Box::new(point),
                });
            }
            Err(OracleError::Unbounded) => {
                return Err(ScaError::Unbounded { iteration });
            }
            Err(OracleError::Numerical { status }) => {
                return Err(ScaError::Numerical { iteration, status });
            }
        }
    }

    Ok(ScaSolution {
        point,
        objective: last_objective,
        iterations: config.max_iters,
        status: ScaStatus::NotConverged,
    })
}

fn relative_change(current: f64, previous: f64) -> f64 {
    (current - previous).abs() / previous.abs().max(f64::MIN_POSITIVE)
}
