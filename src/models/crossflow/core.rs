//! Cross-flow layer sizing internals.
//!
//! The coupled model: two channel arrays ([`channel`]) linked through the
//! contact-cell grid ([`grid`]) by the [`layer`] composition, plus the error
//! taxonomy, parameter surface, and report rendering. The public adapter in
//! the parent module is a thin wrapper over [`Layer`].

mod channel;
mod error;
mod grid;
mod layer;
mod params;
mod report;

pub use error::{DesignError, ModelingWarning};

pub(crate) use layer::Layer;
pub(crate) use report::solution_table;
