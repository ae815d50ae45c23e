//! Clarabel-backed oracle.
//!
//! A posynomial program is convex in log-space: with `y = ln x`, a monomial
//! becomes affine and a posynomial constraint becomes a log-sum-exp
//! inequality. This module lowers that form onto Clarabel's cones:
//!
//! - monomial equalities land in the zero cone,
//! - single-term inequalities become linear nonnegative-cone rows,
//! - each summand of a multi-term inequality gets an auxiliary variable
//!   `u_k >= exp(r_k)` expressed with one exponential cone, with a linear
//!   row tying `sum(u_k) <= 1`,
//! - a multi-term objective is epigraph-lifted through an extra variable.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};

use crate::support::gp::{GpProgram, PosyRow, Term};

use super::{ConvexOracle, OracleError, OracleSolution};

/// Settings forwarded to the interior-point solver.
#[derive(Debug, Clone)]
pub struct OracleSettings {
    pub verbose: bool,
    pub max_iter: u32,
    /// Wall-clock limit in seconds; overruns surface as a numerical failure,
    /// which the driver reports as a non-converged solve.
    pub time_limit: f64,
    pub tol_gap_abs: f64,
    pub tol_gap_rel: f64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            verbose: false,
            max_iter: 200,
            time_limit: f64::INFINITY,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
        }
    }
}

/// The packaged [`ConvexOracle`] implementation.
#[derive(Debug, Clone, Default)]
pub struct ClarabelOracle {
    settings: OracleSettings,
}

impl ClarabelOracle {
    #[must_use]
    pub fn new(settings: OracleSettings) -> Self {
        Self { settings }
    }
}

impl ConvexOracle for ClarabelOracle {
    fn solve(&self, program: &GpProgram) -> Result<OracleSolution, OracleError> {
        let conic = ConicForm::build(program);

        let settings = DefaultSettingsBuilder::default()
            .verbose(self.settings.verbose)
            .max_iter(self.settings.max_iter)
            .time_limit(self.settings.time_limit)
            .tol_gap_abs(self.settings.tol_gap_abs)
            .tol_gap_rel(self.settings.tol_gap_rel)
            .build()
            .expect("oracle settings are valid");

        let p = CscMatrix::new(
            conic.ncols,
            conic.ncols,
            vec![0; conic.ncols + 1],
            Vec::new(),
            Vec::new(),
        );
        let a = csc_from_triplets(conic.nrows, conic.ncols, conic.triplets);

        let mut solver = DefaultSolver::new(&p, &conic.q, &a, &conic.b, &conic.cones, settings);
        solver.solve();

        match solver.solution.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {
                let n_y = program.names.len();
                let x: Vec<f64> = solver.solution.x[..n_y].iter().map(|y| y.exp()).collect();
                let objective = eval_terms(&program.objective, &x);
                Ok(OracleSolution { x, objective })
            }
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                Err(OracleError::Infeasible)
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                Err(OracleError::Unbounded)
            }
            status => Err(OracleError::Numerical {
                status: format!("{status:?}"),
            }),
        }
    }
}

fn eval_terms(terms: &[Term], x: &[f64]) -> f64 {
    terms
        .iter()
        .map(|t| {
            t.exps
                .iter()
                .fold(t.coeff, |acc, &(col, a)| acc * x[col].powf(a))
        })
        .sum()
}

/// The assembled conic problem, rows ordered zero / nonnegative / exponential.
struct ConicForm {
    ncols: usize,
    nrows: usize,
    triplets: Vec<(usize, usize, f64)>,
    b: Vec<f64>,
    q: Vec<f64>,
    cones: Vec<SupportedConeT<f64>>,
}

impl ConicForm {
    fn build(program: &GpProgram) -> Self {
        let n_y = program.names.len();
        let mut ncols = n_y;

        let obj_lifted = program.objective.len() > 1;
        let tau_col = if obj_lifted {
            let col = ncols;
            ncols += 1;
            Some(col)
        } else {
            None
        };

        let (linear, lifted): (Vec<&PosyRow>, Vec<&PosyRow>) = program
            .inequalities
            .iter()
            .partition(|row| row.terms.len() == 1);
        let u_starts: Vec<usize> = lifted
            .iter()
            .map(|row| {
                let start = ncols;
                ncols += row.terms.len();
                start
            })
            .collect();
        let obj_u_start = if obj_lifted {
            let start = ncols;
            ncols += program.objective.len();
            start
        } else {
            0
        };

        let mut triplets = Vec::new();
        let mut b = Vec::new();
        let mut row = 0;

        // Zero cone: ln c + a.y == 0.
        for eq in &program.equalities {
            for &(col, a) in &eq.term.exps {
                triplets.push((row, col, a));
            }
            b.push(-eq.term.coeff.ln());
            row += 1;
        }
        let n_zero = row;

        // Nonnegative cone. Single-term rows reduce to a.y <= ln((1-k)/c);
        // lifted rows contribute their sum bound over the auxiliaries.
        for ineq in &linear {
            let term = &ineq.terms[0];
            for &(col, a) in &term.exps {
                triplets.push((row, col, a));
            }
            b.push(((1.0 - ineq.constant) / term.coeff).ln());
            row += 1;
        }
        for (ineq, &u_start) in lifted.iter().zip(&u_starts) {
            for k in 0..ineq.terms.len() {
                triplets.push((row, u_start + k, 1.0));
            }
            b.push(1.0 - ineq.constant);
            row += 1;
        }
        if obj_lifted {
            for k in 0..program.objective.len() {
                triplets.push((row, obj_u_start + k, 1.0));
            }
            b.push(1.0);
            row += 1;
        }
        let n_nonneg = row - n_zero;

        // Exponential cones: (r_k, 1, u_k) encodes u_k >= exp(r_k).
        let mut n_exp = 0;
        let mut push_exp_cone =
            |term: &Term, u_col: usize, tau: Option<usize>, row: &mut usize| {
                for &(col, a) in &term.exps {
                    triplets.push((*row, col, -a));
                }
                if let Some(tau_col) = tau {
                    triplets.push((*row, tau_col, 1.0));
                }
                b.push(term.coeff.ln());
                *row += 1;
                b.push(1.0);
                *row += 1;
                triplets.push((*row, u_col, -1.0));
                b.push(0.0);
                *row += 1;
            };
        for (ineq, &u_start) in lifted.iter().zip(&u_starts) {
            for (k, term) in ineq.terms.iter().enumerate() {
                push_exp_cone(term, u_start + k, None, &mut row);
                n_exp += 1;
            }
        }
        if obj_lifted {
            for (k, term) in program.objective.iter().enumerate() {
                push_exp_cone(term, obj_u_start + k, tau_col, &mut row);
                n_exp += 1;
            }
        }

        let mut q = vec![0.0; ncols];
        if let Some(tau_col) = tau_col {
            q[tau_col] = 1.0;
        } else {
            for &(col, a) in &program.objective[0].exps {
                q[col] += a;
            }
        }

        let mut cones = Vec::new();
        if n_zero > 0 {
            cones.push(SupportedConeT::ZeroConeT(n_zero));
        }
        if n_nonneg > 0 {
            cones.push(SupportedConeT::NonnegativeConeT(n_nonneg));
        }
        for _ in 0..n_exp {
            cones.push(SupportedConeT::ExponentialConeT());
        }

        Self {
            ncols,
            nrows: row,
            triplets,
            b,
            q,
            cones,
        }
    }
}

/// Builds a compressed-sparse-column matrix from unordered triplets.
fn csc_from_triplets(
    nrows: usize,
    ncols: usize,
    mut triplets: Vec<(usize, usize, f64)>,
) -> CscMatrix<f64> {
    triplets.sort_unstable_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));

    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::with_capacity(triplets.len());
    let mut nzval = Vec::with_capacity(triplets.len());
    for &(r, c, v) in &triplets {
        colptr[c + 1] += 1;
        rowval.push(r);
        nzval.push(v);
    }
    for c in 0..ncols {
        colptr[c + 1] += colptr[c];
    }
    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use approx::assert_relative_eq;

    use crate::support::gp::{lower, Constraint, Monomial, Posynomial, VarTable};

    use super::*;

    fn solve(
        table: &VarTable,
        objective: &Posynomial,
        constraints: &[Constraint],
    ) -> Result<OracleSolution, OracleError> {
        let (program, _) = lower(table, objective, constraints, &BTreeMap::new())
            .expect("test programs lower cleanly");
        ClarabelOracle::default().solve(&program)
    }

    #[test]
    fn solves_a_linear_log_space_program() {
        let mut table = VarTable::new();
        let x = table.var("x", "-", 1.0, (1e-3, 1e3));
        let y = table.var("y", "-", 1.0, (1e-3, 1e3));

        // minimize 1/(x*y) with x <= 2, y <= 3: optimum at the caps.
        let objective = Posynomial::from((Monomial::var(x) * Monomial::var(y)).recip());
        let constraints = [
            Constraint::leq("x cap", Monomial::var(x), Monomial::constant(2.0)),
            Constraint::leq("y cap", Monomial::var(y), Monomial::constant(3.0)),
        ];

        let solution = solve(&table, &objective, &constraints).expect("solves");
        assert_relative_eq!(solution.x[0], 2.0, max_relative = 1e-5);
        assert_relative_eq!(solution.x[1], 3.0, max_relative = 1e-5);
        assert_relative_eq!(solution.objective, 1.0 / 6.0, max_relative = 1e-5);
    }

    #[test]
    fn solves_a_lifted_objective() {
        let mut table = VarTable::new();
        let x = table.var("x", "-", 1.0, (1e-3, 1e3));

        // minimize x + 1/x: optimum 2 at x = 1.
        let objective = Monomial::var(x) + Monomial::var(x).recip();

        let solution = solve(&table, &objective, &[]).expect("solves");
        assert_relative_eq!(solution.x[0], 1.0, max_relative = 1e-4);
        assert_relative_eq!(solution.objective, 2.0, max_relative = 1e-6);
    }

    #[test]
    fn solves_a_multi_term_inequality_with_an_equality() {
        let mut table = VarTable::new();
        let x = table.var("x", "-", 1.0, (1e-3, 1e3));
        let y = table.var("y", "-", 1.0, (1e-3, 1e3));

        // minimize 1/x with x + y <= 4 and y == 1: x -> 3.
        let objective = Posynomial::from(Monomial::var(x).recip());
        let constraints = [
            Constraint::leq(
                "sum cap",
                Monomial::var(x) + Monomial::var(y),
                Monomial::constant(4.0),
            ),
            Constraint::equality("pin y", Monomial::var(y), Monomial::constant(1.0)),
        ];

        let solution = solve(&table, &objective, &constraints).expect("solves");
        assert_relative_eq!(solution.x[0], 3.0, max_relative = 1e-4);
        assert_relative_eq!(solution.x[1], 1.0, max_relative = 1e-5);
    }

    #[test]
    fn reports_infeasibility() {
        let mut table = VarTable::new();
        let x = table.var("x", "-", 1.0, (1e-3, 1e3));

        let objective = Posynomial::from(Monomial::var(x));
        let constraints = [
            Constraint::leq("x small", Monomial::var(x), Monomial::constant(0.5)),
            Constraint::leq("x large", Monomial::constant(2.0), Monomial::var(x)),
        ];

        let result = solve(&table, &objective, &constraints);
        assert!(matches!(result, Err(OracleError::Infeasible)));
    }
}
