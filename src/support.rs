//! Supporting utilities used by models.
//!
//! These modules are part of the public API because they're useful on their
//! own, but their APIs are not stable. Breaking changes may occur as needed.
//!
//! - [`gp`]: posynomial expressions, constraints, and program lowering.
//! - [`oracle`]: the convex-program oracle contract and Clarabel backend.
//! - [`sca`]: the successive convex approximation driver and warm-start cache.
//! - [`props`]: static fluid and material property records.

pub mod gp;
pub mod oracle;
pub mod props;
pub mod sca;
