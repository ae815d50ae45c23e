use super::expr::{Monomial, Posynomial};
use super::variable::DesignPoint;

/// Convexity classification, attached to every constraint at construction.
///
/// The successive-approximation driver partitions on this directly; there is
/// no mode flag to enable signomial modeling after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintClass {
    /// Directly compatible with a convex (geometric-program) solve.
    Posynomial,
    /// Contains a multi-term right-hand side and needs local approximation.
    Signomial,
}

/// A single model constraint, `lhs <= rhs` or `lhs == rhs`.
///
/// Constraints are stored in natural form rather than `<= 1` normal form so
/// diagnostics can print the physical relation; normalization happens when
/// the constraint is lowered for the oracle.
#[derive(Debug, Clone)]
pub struct Constraint {
    label: String,
    lhs: Posynomial,
    rhs: Posynomial,
    equality: bool,
}

impl Constraint {
    /// An inequality `lhs <= rhs`.
    ///
    /// The constraint is posynomial-class when the right-hand side is a
    /// single monomial and signomial-class otherwise.
    pub fn leq(
        label: impl Into<String>,
        lhs: impl Into<Posynomial>,
        rhs: impl Into<Posynomial>,
    ) -> Self {
        Self {
            label: label.into(),
            lhs: lhs.into(),
            rhs: rhs.into(),
            equality: false,
        }
    }

    /// A monomial equality `lhs == rhs`.
    ///
    /// Only monomials may be equated; a posynomial equality is nonconvex in
    /// both directions and has no place in this model.
    pub fn equality(label: impl Into<String>, lhs: Monomial, rhs: Monomial) -> Self {
        Self {
            label: label.into(),
            lhs: lhs.into(),
            rhs: rhs.into(),
            equality: true,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn lhs(&self) -> &Posynomial {
        &self.lhs
    }

    #[must_use]
    pub fn rhs(&self) -> &Posynomial {
        &self.rhs
    }

    #[must_use]
    pub fn is_equality(&self) -> bool {
        self.equality
    }

    #[must_use]
    pub fn class(&self) -> ConstraintClass {
        if self.equality || self.rhs.as_monomial().is_some() {
            ConstraintClass::Posynomial
        } else {
            ConstraintClass::Signomial
        }
    }

    /// Replaces a signomial right-hand side with its local monomial fit.
    ///
    /// Because the fit never exceeds the true posynomial, the result is a
    /// conservative posynomial restriction: any point feasible for it is
    /// feasible for the original constraint.
    #[must_use]
    pub fn monomialized(&self, point: &DesignPoint) -> Constraint {
        match self.class() {
            ConstraintClass::Posynomial => self.clone(),
            ConstraintClass::Signomial => Constraint {
                label: self.label.clone(),
                lhs: self.lhs.clone(),
                rhs: self.rhs.monomial_fit(point).into(),
                equality: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::support::gp::VarTable;

    use super::*;

    #[test]
    fn classification_is_fixed_at_construction() {
        let mut table = VarTable::new();
        let x = table.var("x", "-", 1.0, (1e-3, 1e3));
        let y = table.var("y", "-", 1.0, (1e-3, 1e3));
        let z = table.var("z", "-", 1.0, (1e-3, 1e3));

        let posy = Constraint::leq(
            "posy",
            Monomial::var(x) + Monomial::var(y),
            Monomial::var(z),
        );
        assert_eq!(posy.class(), ConstraintClass::Posynomial);

        let signo = Constraint::leq(
            "signo",
            Monomial::var(x),
            Monomial::var(y) + Monomial::var(z),
        );
        assert_eq!(signo.class(), ConstraintClass::Signomial);

        let eq = Constraint::equality("eq", Monomial::var(x), Monomial::var(y) * 2.0);
        assert_eq!(eq.class(), ConstraintClass::Posynomial);
        assert!(eq.is_equality());
    }

    #[test]
    fn monomialized_signomial_becomes_posynomial() {
        let mut table = VarTable::new();
        let x = table.var("x", "-", 1.0, (1e-3, 1e3));
        let y = table.var("y", "-", 2.0, (1e-3, 1e3));
        let z = table.var("z", "-", 3.0, (1e-3, 1e3));
        let point = table.initial_point();

        let signo = Constraint::leq(
            "signo",
            Monomial::var(x),
            Monomial::var(y) + Monomial::var(z),
        );
        let relaxed = signo.monomialized(&point);
        assert_eq!(relaxed.class(), ConstraintClass::Posynomial);
        assert_eq!(relaxed.label(), "signo");

        // The fit agrees with the original right-hand side at the point.
        let fit = relaxed.rhs().as_monomial().expect("monomial rhs");
        approx::assert_relative_eq!(fit.eval(&point), 5.0, epsilon = 1e-12);
    }
}
