//! # Crossflow HX
//!
//! Cross-flow plate-fin heat exchanger sizing by successive geometric
//! programming.
//!
//! Two orthogonal arrays of rectangular flow channels, one hot and one
//! cold, meet across a shared grid of contact cells. The crate builds the
//! coupled constraint model over that geometry and drives a sequence of
//! convex solves to a locally optimal, feasible design: channel widths, fin
//! geometry, and flow rates that maximize heat transfer within
//! pressure-drop, material, and volume limits.
//!
//! ## Crate layout
//!
//! - [`models`]: the public [`models::crossflow`] sizing model.
//! - [`support`]: supporting toolkits used by models: geometric-programming
//!   expressions, the convex oracle, the refinement driver, and property
//!   records.
//!
//! ## Quick start
//!
//! ```no_run
//! use crossflow_hx::models::crossflow::{CrossflowHx, DesignRequest};
//! use crossflow_hx::support::props::{Fluid, Material};
//! use uom::si::power::watt;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hx = CrossflowHx::new(
//!         3,
//!         3,
//!         Fluid::water(),
//!         Fluid::air(),
//!         Material::stainless_steel(),
//!     )?;
//!
//!     let design = hx.design(&DesignRequest::new("example"))?;
//!     println!("transferred {:.1} W", design.total_heat.get::<watt>());
//!     println!("{}", design.report());
//!     Ok(())
//! }
//! ```

pub mod models;
pub mod support;
