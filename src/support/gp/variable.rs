use std::collections::HashMap;

/// An opaque handle to a variable registered in a [`VarTable`].
///
/// Handles are cheap to copy and only meaningful together with the table
/// that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(u32);

impl Var {
    /// The dense index of this variable within its table.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The declaration of a single optimization variable.
///
/// Every variable is strictly positive and carries finite bounds. The bounds
/// are lowered into the convex program alongside the model constraints, so a
/// well-formed table can never produce an unbounded relaxation.
#[derive(Debug, Clone)]
pub struct VarDef {
    pub name: String,
    /// Display unit for reports and diagnostics, e.g. `"W"` or `"m/s"`.
    pub unit: &'static str,
    /// Initial guess used when no warm start is supplied.
    pub init: f64,
    pub lower: f64,
    pub upper: f64,
}

/// An explicit schema of named, unit-labeled, bounded positive variables.
///
/// The table issues strongly-typed [`Var`] handles at registration time and
/// supports reverse lookup by name for external parameter substitution.
#[derive(Debug, Default)]
pub struct VarTable {
    defs: Vec<VarDef>,
    by_name: HashMap<String, Var>,
}

impl VarTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a variable and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics if the name is already registered or the declaration is not a
    /// positive, finite `lower <= init <= upper` range. Both indicate a bug
    /// in model construction, not a runtime condition.
    pub fn var(
        &mut self,
        name: impl Into<String>,
        unit: &'static str,
        init: f64,
        (lower, upper): (f64, f64),
    ) -> Var {
        let name = name.into();
        assert!(
            lower > 0.0 && lower.is_finite() && upper.is_finite() && lower <= upper,
            "variable `{name}` must have positive finite bounds"
        );
        assert!(
            (lower..=upper).contains(&init),
            "variable `{name}` initial guess {init} outside [{lower}, {upper}]"
        );
        let var = Var(u32::try_from(self.defs.len()).expect("variable count fits in u32"));
        let previous = self.by_name.insert(name.clone(), var);
        assert!(previous.is_none(), "variable `{name}` registered twice");
        self.defs.push(VarDef {
            name,
            unit,
            init,
            lower,
            upper,
        });
        var
    }

    /// Registers `n` variables named `base[0]` through `base[n-1]`.
    pub fn array(
        &mut self,
        base: &str,
        unit: &'static str,
        init: f64,
        bounds: (f64, f64),
        n: usize,
    ) -> Vec<Var> {
        (0..n)
            .map(|i| self.var(format!("{base}[{i}]"), unit, init, bounds))
            .collect()
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Var> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn def(&self, var: Var) -> &VarDef {
        &self.defs[var.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Var, &VarDef)> {
        self.defs
            .iter()
            .enumerate()
            .map(|(i, def)| (Var(i as u32), def))
    }

    /// A dense point holding every variable's initial guess.
    #[must_use]
    pub fn initial_point(&self) -> DesignPoint {
        DesignPoint {
            values: self.defs.iter().map(|d| d.init).collect(),
        }
    }
}

/// A dense assignment of one value per table variable.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignPoint {
    values: Vec<f64>,
}

impl DesignPoint {
    #[must_use]
    pub fn get(&self, var: Var) -> f64 {
        self.values[var.index()]
    }

    pub fn set(&mut self, var: Var, value: f64) {
        self.values[var.index()] = value;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The elementwise geometric mean of two points.
    ///
    /// This is the midpoint in log-space, used for damped restarts of the
    /// successive-approximation loop.
    ///
    /// # Panics
    ///
    /// Panics if the points have different lengths.
    #[must_use]
    pub fn log_midpoint(a: &Self, b: &Self) -> Self {
        assert_eq!(a.len(), b.len(), "points must come from the same table");
        Self {
            values: a
                .values
                .iter()
                .zip(&b.values)
                .map(|(x, y)| (x * y).sqrt())
                .collect(),
        }
    }
}
