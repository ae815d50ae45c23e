use std::collections::BTreeMap;
use std::ops::{Add, Div, Mul};

use super::variable::{DesignPoint, Var};

/// A monomial `c * prod(x_v ^ a_v)` with a strictly positive coefficient.
///
/// Exponents may be any real number; an exponent of zero is never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Monomial {
    coeff: f64,
    exps: BTreeMap<Var, f64>,
}

impl Monomial {
    /// A constant monomial.
    ///
    /// # Panics
    ///
    /// Panics if the coefficient is not strictly positive and finite, which
    /// would make the term meaningless in log-space.
    #[must_use]
    pub fn constant(c: f64) -> Self {
        assert!(
            c > 0.0 && c.is_finite(),
            "monomial coefficient must be positive and finite, got {c}"
        );
        Self {
            coeff: c,
            exps: BTreeMap::new(),
        }
    }

    /// The monomial `x_v`.
    #[must_use]
    pub fn var(v: Var) -> Self {
        let mut exps = BTreeMap::new();
        exps.insert(v, 1.0);
        Self { coeff: 1.0, exps }
    }

    #[must_use]
    pub fn coefficient(&self) -> f64 {
        self.coeff
    }

    pub fn exponents(&self) -> impl Iterator<Item = (Var, f64)> + '_ {
        self.exps.iter().map(|(&v, &a)| (v, a))
    }

    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.exps.is_empty()
    }

    /// Raises the monomial to a real power.
    #[must_use]
    pub fn pow(mut self, p: f64) -> Self {
        self.coeff = self.coeff.powf(p);
        self.exps.retain(|_, a| {
            *a *= p;
            *a != 0.0
        });
        self
    }

    /// The reciprocal monomial.
    #[must_use]
    pub fn recip(self) -> Self {
        self.pow(-1.0)
    }

    #[must_use]
    pub fn eval(&self, point: &DesignPoint) -> f64 {
        self.exps
            .iter()
            .fold(self.coeff, |acc, (&v, &a)| acc * point.get(v).powf(a))
    }
}

impl Mul for Monomial {
    type Output = Monomial;

    fn mul(mut self, rhs: Monomial) -> Monomial {
        self.coeff *= rhs.coeff;
        for (v, a) in rhs.exps {
            let e = self.exps.entry(v).or_insert(0.0);
            *e += a;
            if *e == 0.0 {
                self.exps.remove(&v);
            }
        }
        self
    }
}

impl Mul<f64> for Monomial {
    type Output = Monomial;

    fn mul(mut self, rhs: f64) -> Monomial {
        assert!(
            rhs > 0.0 && rhs.is_finite(),
            "monomial scale must be positive and finite, got {rhs}"
        );
        self.coeff *= rhs;
        self
    }
}

impl Div for Monomial {
    type Output = Monomial;

    fn div(self, rhs: Monomial) -> Monomial {
        self * rhs.recip()
    }
}

impl Add for Monomial {
    type Output = Posynomial;

    fn add(self, rhs: Monomial) -> Posynomial {
        Posynomial {
            terms: vec![self, rhs],
        }
    }
}

/// A posynomial: a nonempty sum of [`Monomial`] terms.
#[derive(Debug, Clone, PartialEq)]
pub struct Posynomial {
    terms: Vec<Monomial>,
}

impl Posynomial {
    #[must_use]
    pub fn terms(&self) -> &[Monomial] {
        &self.terms
    }

    /// Returns the single term when the posynomial is a monomial.
    #[must_use]
    pub fn as_monomial(&self) -> Option<&Monomial> {
        match self.terms.as_slice() {
            [term] => Some(term),
            _ => None,
        }
    }

    #[must_use]
    pub fn eval(&self, point: &DesignPoint) -> f64 {
        self.terms.iter().map(|t| t.eval(point)).sum()
    }

    /// The best local monomial approximation about `point`.
    ///
    /// Each term is weighted by its fractional contribution to the sum at the
    /// expansion point, which is the tangent-plane fit in log-space. The fit
    /// equals the posynomial at `point` and, by the AM-GM inequality, never
    /// exceeds it anywhere else.
    #[must_use]
    pub fn monomial_fit(&self, point: &DesignPoint) -> Monomial {
        if let Some(m) = self.as_monomial() {
            return m.clone();
        }

        let values: Vec<f64> = self.terms.iter().map(|t| t.eval(point)).collect();
        let total: f64 = values.iter().sum();

        let mut coeff = 1.0;
        let mut exps: BTreeMap<Var, f64> = BTreeMap::new();
        for (term, value) in self.terms.iter().zip(&values) {
            let weight = value / total;
            if weight == 0.0 {
                continue;
            }
            coeff *= (term.coefficient() / weight).powf(weight);
            for (v, a) in term.exponents() {
                let e = exps.entry(v).or_insert(0.0);
                *e += weight * a;
                if *e == 0.0 {
                    exps.remove(&v);
                }
            }
        }
        Monomial { coeff, exps }
    }
}

impl From<Monomial> for Posynomial {
    fn from(term: Monomial) -> Self {
        Self { terms: vec![term] }
    }
}

impl FromIterator<Monomial> for Posynomial {
    /// # Panics
    ///
    /// Panics on an empty iterator; a posynomial has at least one term.
    fn from_iter<I: IntoIterator<Item = Monomial>>(iter: I) -> Self {
        let terms: Vec<Monomial> = iter.into_iter().collect();
        assert!(!terms.is_empty(), "a posynomial needs at least one term");
        Self { terms }
    }
}

impl Add for Posynomial {
    type Output = Posynomial;

    fn add(mut self, rhs: Posynomial) -> Posynomial {
        self.terms.extend(rhs.terms);
        self
    }
}

impl Add<Monomial> for Posynomial {
    type Output = Posynomial;

    fn add(mut self, rhs: Monomial) -> Posynomial {
        self.terms.push(rhs);
        self
    }
}

impl Mul<Monomial> for Posynomial {
    type Output = Posynomial;

    fn mul(mut self, rhs: Monomial) -> Posynomial {
        for term in &mut self.terms {
            *term = term.clone() * rhs.clone();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::support::gp::VarTable;

    use super::*;

    fn xy() -> (VarTable, Var, Var) {
        let mut table = VarTable::new();
        let x = table.var("x", "-", 2.0, (1e-3, 1e3));
        let y = table.var("y", "-", 3.0, (1e-3, 1e3));
        (table, x, y)
    }

    #[test]
    fn monomial_arithmetic_and_eval() {
        let (table, x, y) = xy();
        let point = table.initial_point();

        let m = Monomial::constant(0.5) * Monomial::var(x).pow(2.0) / Monomial::var(y);
        assert_relative_eq!(m.eval(&point), 0.5 * 4.0 / 3.0);

        // x^2 / x^2 cancels back to a constant
        let c = Monomial::var(x).pow(2.0) / Monomial::var(x).pow(2.0);
        assert!(c.is_constant());
        assert_relative_eq!(c.eval(&point), 1.0);
    }

    #[test]
    fn monomial_fit_matches_value_at_expansion_point() {
        let (table, x, y) = xy();
        let point = table.initial_point();

        let posy = Monomial::var(x) + Monomial::var(y) * 2.0;
        let fit = posy.monomial_fit(&point);
        assert_relative_eq!(fit.eval(&point), posy.eval(&point), epsilon = 1e-12);
    }

    #[test]
    fn monomial_fit_is_a_global_lower_bound() {
        let (table, x, y) = xy();
        let point = table.initial_point();
        let posy = Monomial::var(x) + Monomial::var(y) * 2.0;
        let fit = posy.monomial_fit(&point);

        // AM-GM: the fit underestimates the posynomial away from the point.
        for (vx, vy) in [(0.5, 9.0), (7.0, 0.2), (2.0, 3.0), (100.0, 100.0)] {
            let mut p = table.initial_point();
            p.set(x, vx);
            p.set(y, vy);
            assert!(fit.eval(&p) <= posy.eval(&p) * (1.0 + 1e-12));
        }
    }

    #[test]
    fn monomial_fit_of_a_monomial_is_itself() {
        let (table, x, _) = xy();
        let point = table.initial_point();
        let posy = Posynomial::from(Monomial::var(x) * 3.0);
        assert_eq!(posy.monomial_fit(&point), Monomial::var(x) * 3.0);
        assert_relative_eq!(posy.eval(&point), 6.0);
    }
}
