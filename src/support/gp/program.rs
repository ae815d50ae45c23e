//! Lowering of model constraints into the oracle's program form.
//!
//! Lowering normalizes every constraint to `posynomial <= 1` or
//! `monomial == 1`, folds substituted parameters into term coefficients,
//! and appends the schema bounds of every free variable as monomial rows.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use super::constraint::{Constraint, ConstraintClass};
use super::expr::{Monomial, Posynomial};
use super::variable::{Var, VarTable};

/// Tolerance for accepting a fully-substituted constraint as satisfied.
const CONSTANT_TOL: f64 = 1e-9;

/// One monomial term over free-variable columns.
#[derive(Debug, Clone)]
pub struct Term {
    pub coeff: f64,
    /// `(column, exponent)` pairs, one per free variable in the term.
    pub exps: Vec<(usize, f64)>,
}

/// A posynomial inequality `constant + sum(terms) <= 1`.
#[derive(Debug, Clone)]
pub struct PosyRow {
    pub label: String,
    pub constant: f64,
    pub terms: Vec<Term>,
}

/// A monomial equality `term == 1`.
#[derive(Debug, Clone)]
pub struct MonoRow {
    pub label: String,
    pub term: Term,
}

/// A fully-posynomial program over named positive variables.
///
/// This is the opaque-oracle input contract: variable names carry their
/// display units, the objective is minimized, and every constraint is in
/// normal form.
#[derive(Debug, Clone)]
pub struct GpProgram {
    /// One `"name [unit]"` entry per free-variable column.
    pub names: Vec<String>,
    /// Posynomial objective to minimize.
    pub objective: Vec<Term>,
    pub inequalities: Vec<PosyRow>,
    pub equalities: Vec<MonoRow>,
}

/// Maps free-variable columns back to table handles.
#[derive(Debug, Clone)]
pub struct FreeVarMap {
    cols: Vec<Var>,
    col_of: HashMap<Var, usize>,
}

impl FreeVarMap {
    #[must_use]
    pub fn var_of(&self, col: usize) -> Var {
        self.cols[col]
    }

    #[must_use]
    pub fn col_of(&self, var: Var) -> Option<usize> {
        self.col_of.get(&var).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cols.is_empty()
    }
}

/// Errors surfaced while lowering a constraint set.
#[derive(Debug, Clone, Error)]
pub enum LowerError {
    /// Every variable in the constraint was substituted and the remaining
    /// constant relation is false. With positive terms this also covers a
    /// mixed row whose constant part alone already exceeds one.
    #[error("constraint `{label}` is constant-false after substitution")]
    TriviallyInfeasible { label: String },

    /// A substituted power produced a non-finite or non-positive coefficient.
    #[error("constraint `{label}` has an invalid coefficient after substitution")]
    BadCoefficient { label: String },

    #[error("objective reduces to a constant after substitution")]
    ConstantObjective,

    /// The driver must monomialize signomial constraints before lowering.
    #[error("constraint `{label}` is signomial and was not approximated")]
    Signomial { label: String },
}

/// Lowers an all-posynomial constraint set plus objective to program form.
///
/// # Errors
///
/// Returns a [`LowerError`] if a constraint is still signomial-class, a
/// substitution makes a constraint constant-false, or the objective loses
/// all free variables.
pub fn lower(
    table: &VarTable,
    objective: &Posynomial,
    constraints: &[Constraint],
    substitutions: &BTreeMap<Var, f64>,
) -> Result<(GpProgram, FreeVarMap), LowerError> {
    let mut cols = Vec::new();
    let mut col_of = HashMap::new();
    let mut names = Vec::new();
    for (var, def) in table.iter() {
        if !substitutions.contains_key(&var) {
            col_of.insert(var, cols.len());
            cols.push(var);
            names.push(format!("{} [{}]", def.name, def.unit));
        }
    }
    let map = FreeVarMap { cols, col_of };

    let objective = lower_posynomial(objective, substitutions, &map).ok_or_else(|| {
        LowerError::BadCoefficient {
            label: "objective".to_string(),
        }
    })?;
    if objective.iter().all(|t| t.exps.is_empty()) {
        return Err(LowerError::ConstantObjective);
    }

    let mut inequalities = Vec::new();
    let mut equalities = Vec::new();

    for constraint in constraints {
        lower_constraint(
            constraint,
            substitutions,
            &map,
            &mut inequalities,
            &mut equalities,
        )?;
    }

    // Schema bounds keep every relaxation bounded and every variable positive.
    for (col, &var) in map.cols.iter().enumerate() {
        let def = table.def(var);
        inequalities.push(PosyRow {
            label: format!("lower bound: {}", def.name),
            constant: 0.0,
            terms: vec![Term {
                coeff: def.lower,
                exps: vec![(col, -1.0)],
            }],
        });
        inequalities.push(PosyRow {
            label: format!("upper bound: {}", def.name),
            constant: 0.0,
            terms: vec![Term {
                coeff: def.upper.recip(),
                exps: vec![(col, 1.0)],
            }],
        });
    }

    Ok((
        GpProgram {
            names,
            objective,
            inequalities,
            equalities,
        },
        map,
    ))
}

fn lower_constraint(
    constraint: &Constraint,
    substitutions: &BTreeMap<Var, f64>,
    map: &FreeVarMap,
    inequalities: &mut Vec<PosyRow>,
    equalities: &mut Vec<MonoRow>,
) -> Result<(), LowerError> {
    let label = constraint.label();
    if constraint.class() == ConstraintClass::Signomial {
        return Err(LowerError::Signomial {
            label: label.to_string(),
        });
    }

    let rhs = constraint
        .rhs()
        .as_monomial()
        .expect("posynomial-class constraint has monomial rhs")
        .clone();
    let normalized = constraint.lhs().clone() * rhs.recip();

    let mut constant = 0.0;
    let mut terms = Vec::new();
    for term in &normalized.terms()[..] {
        let lowered = fold_term(term, substitutions, map).ok_or_else(|| {
            LowerError::BadCoefficient {
                label: label.to_string(),
            }
        })?;
        if lowered.exps.is_empty() {
            constant += lowered.coeff;
        } else {
            terms.push(lowered);
        }
    }

    if constraint.is_equality() {
        // A monomial equality lowers to a single term equal to one.
        debug_assert!(terms.len() + usize::from(constant > 0.0) == 1);
        if terms.is_empty() {
            if (constant - 1.0).abs() > CONSTANT_TOL {
                return Err(LowerError::TriviallyInfeasible {
                    label: label.to_string(),
                });
            }
            return Ok(());
        }
        equalities.push(MonoRow {
            label: label.to_string(),
            term: terms.pop().expect("one variable term"),
        });
        return Ok(());
    }

    if terms.is_empty() {
        if constant > 1.0 + CONSTANT_TOL {
            return Err(LowerError::TriviallyInfeasible {
                label: label.to_string(),
            });
        }
        return Ok(());
    }
    // Terms are positive, so a constant part at or above one is already false.
    if constant >= 1.0 {
        return Err(LowerError::TriviallyInfeasible {
            label: label.to_string(),
        });
    }
    inequalities.push(PosyRow {
        label: label.to_string(),
        constant,
        terms,
    });
    Ok(())
}

fn lower_posynomial(
    posy: &Posynomial,
    substitutions: &BTreeMap<Var, f64>,
    map: &FreeVarMap,
) -> Option<Vec<Term>> {
    posy.terms()
        .iter()
        .map(|t| fold_term(t, substitutions, map))
        .collect()
}

/// Folds substituted variables of a monomial into its coefficient and maps
/// the remaining variables to columns. Returns `None` when the folded
/// coefficient degenerates.
fn fold_term(
    term: &Monomial,
    substitutions: &BTreeMap<Var, f64>,
    map: &FreeVarMap,
) -> Option<Term> {
    let mut coeff = term.coefficient();
    let mut exps = Vec::new();
    for (var, a) in term.exponents() {
        match substitutions.get(&var) {
            Some(&value) => coeff *= value.powf(a),
            None => exps.push((
                map.col_of(var)
                    .expect("every unsubstituted variable has a column"),
                a,
            )),
        }
    }
    (coeff.is_finite() && coeff > 0.0).then_some(Term { coeff, exps })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn folds_substituted_parameters_into_coefficients() {
        let mut table = VarTable::new();
        let x = table.var("x", "m", 1.0, (1e-3, 1e3));
        let rho = table.var("rho", "kg/m^3", 1.2, (1e-3, 1e4));

        let objective = Posynomial::from(Monomial::var(x).recip());
        let constraints = [Constraint::leq(
            "scaled cap",
            Monomial::var(rho) * Monomial::var(x),
            Monomial::constant(6.0),
        )];
        let subs = BTreeMap::from([(rho, 2.0)]);

        let (program, map) = lower(&table, &objective, &constraints, &subs).expect("lowers");

        assert_eq!(map.len(), 1);
        assert_eq!(program.names, vec!["x [m]".to_string()]);
        // rho folded: 2/6 * x <= 1, plus two bound rows for x.
        assert_eq!(program.inequalities.len(), 3);
        let row = &program.inequalities[0];
        assert_eq!(row.terms.len(), 1);
        assert_relative_eq!(row.terms[0].coeff, 2.0 / 6.0);
        assert_eq!(row.terms[0].exps, vec![(0, 1.0)]);
    }

    #[test]
    fn detects_constant_false_constraints() {
        let mut table = VarTable::new();
        let x = table.var("x", "-", 1.0, (1e-3, 1e3));
        let c = table.var("c", "-", 1.0, (1e-3, 1e3));

        let objective = Posynomial::from(Monomial::var(x).recip());
        let constraints = [Constraint::leq(
            "impossible",
            Monomial::var(c) * 3.0,
            Monomial::constant(1.0),
        )];
        let subs = BTreeMap::from([(c, 1.0)]);

        let err = lower(&table, &objective, &constraints, &subs).unwrap_err();
        assert!(matches!(
            err,
            LowerError::TriviallyInfeasible { label } if label == "impossible"
        ));
    }

    #[test]
    fn rejects_unapproximated_signomials() {
        let mut table = VarTable::new();
        let x = table.var("x", "-", 1.0, (1e-3, 1e3));
        let y = table.var("y", "-", 1.0, (1e-3, 1e3));

        let objective = Posynomial::from(Monomial::var(x).recip());
        let constraints = [Constraint::leq(
            "sum bound",
            Monomial::var(x),
            Monomial::var(y) + Monomial::constant(1.0),
        )];

        let err = lower(&table, &objective, &constraints, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, LowerError::Signomial { .. }));
    }

    #[test]
    fn emits_bound_rows_for_free_variables_only() {
        let mut table = VarTable::new();
        let x = table.var("x", "-", 1.0, (0.5, 2.0));
        let p = table.var("p", "-", 1.0, (1e-3, 1e3));

        let objective = Posynomial::from(Monomial::var(x).recip());
        let subs = BTreeMap::from([(p, 10.0)]);
        let (program, _) = lower(&table, &objective, &[], &subs).expect("lowers");

        // Two bound rows for x, none for the substituted p.
        assert_eq!(program.inequalities.len(), 2);
        assert!(program.inequalities[0].label.contains("x"));
    }
}
