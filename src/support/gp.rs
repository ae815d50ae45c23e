//! Geometric-programming modeling toolkit.
//!
//! This module provides the building blocks for posynomial models over
//! named, unit-labeled, bounded positive variables:
//!
//! - **Schema**: [`VarTable`] issues strongly-typed [`Var`] handles from
//!   explicit `(name, unit, initial guess, bounds)` declarations.
//! - **Expressions**: [`Monomial`] and [`Posynomial`], with the local
//!   monomial fit that powers successive convex approximation.
//! - **Constraints**: [`Constraint`] with its [`ConstraintClass`] fixed at
//!   construction time.
//! - **Lowering**: [`lower`] normalizes a fully-posynomial constraint set
//!   into the [`GpProgram`] form consumed by a convex oracle, folding
//!   substituted parameters into term coefficients.
//!
//! # Example
//!
//! ```
//! use crossflow_hx::support::gp::{Constraint, Monomial, VarTable};
//!
//! let mut table = VarTable::new();
//! let w = table.var("w", "m", 0.01, (1e-4, 0.5));
//! let h = table.var("h", "m", 0.004, (1e-4, 0.05));
//! let area = table.var("A", "m^2", 4e-5, (1e-8, 0.25));
//!
//! let geometry = Constraint::equality(
//!     "frontal area",
//!     Monomial::var(area),
//!     Monomial::var(w) * Monomial::var(h),
//! );
//! assert_eq!(geometry.label(), "frontal area");
//! ```

mod constraint;
mod expr;
mod program;
mod variable;

pub use constraint::{Constraint, ConstraintClass};
pub use expr::{Monomial, Posynomial};
pub use program::{lower, FreeVarMap, GpProgram, LowerError, MonoRow, PosyRow, Term};
pub use variable::{DesignPoint, Var, VarDef, VarTable};
