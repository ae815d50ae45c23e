//! Cross-flow plate-fin heat exchanger sizing.
//!
//! [`CrossflowHx`] is the public entry point. Configure the layer shape and
//! working substances once, then solve [`DesignRequest`]s against it; each
//! request carries its own identifier, parameter overrides, and optional
//! warm start, so independent requests share no state. The
//! [`twine_core::Model`] implementation is a thin adapter over
//! [`CrossflowHx::design`].
//!
//! The computational core is in the internal `core` module.

mod core;

pub use self::core::{DesignError, ModelingWarning};

use std::collections::BTreeMap;

use twine_core::Model;
use uom::si::{f64::Power, power::watt};

use crate::support::gp::DesignPoint;
use crate::support::oracle::{ClarabelOracle, OracleSettings};
use crate::support::props::{Fluid, Material};
use crate::support::sca::{self, CacheKey, ScaConfig, ScaStatus};

use self::core::{solution_table, Layer};

/// A configured cross-flow layer sizing model.
#[derive(Debug)]
pub struct CrossflowHx {
    n_hot: usize,
    n_cold: usize,
    hot_fluid: Fluid,
    cold_fluid: Fluid,
    material: Material,
    oracle: ClarabelOracle,
    sca: ScaConfig,
}

impl CrossflowHx {
    /// Creates a sizing model for an `n_hot` by `n_cold` layer.
    ///
    /// # Errors
    ///
    /// Returns [`DesignError::InvalidInput`] when either channel count is
    /// zero.
    pub fn new(
        n_hot: usize,
        n_cold: usize,
        hot_fluid: Fluid,
        cold_fluid: Fluid,
        material: Material,
    ) -> Result<Self, DesignError> {
        if n_hot == 0 || n_cold == 0 {
            return Err(DesignError::InvalidInput {
                reason: format!("channel counts must be positive, got {n_hot} by {n_cold}"),
            });
        }
        Ok(Self {
            n_hot,
            n_cold,
            hot_fluid,
            cold_fluid,
            material,
            oracle: ClarabelOracle::default(),
            sca: ScaConfig::default(),
        })
    }

    #[must_use]
    pub fn with_sca_config(mut self, config: ScaConfig) -> Self {
        self.sca = config;
        self
    }

    #[must_use]
    pub fn with_oracle_settings(mut self, settings: OracleSettings) -> Self {
        self.oracle = ClarabelOracle::new(settings);
        self
    }

    /// Sizes the layer for one request.
    ///
    /// Builds a fresh coupled model, substitutes the request's inputs over
    /// the defaults, and drives the successive-approximation loop. A design
    /// that stops at the iteration cap comes back `Ok` but tagged
    /// [`ScaStatus::NotConverged`]; correlation-domain findings come back as
    /// warnings, never as failures.
    ///
    /// # Errors
    ///
    /// See [`DesignError`].
    pub fn design(&self, request: &DesignRequest) -> Result<SolvedDesign, DesignError> {
        let layer = Layer::build(
            self.n_hot,
            self.n_cold,
            &self.hot_fluid,
            &self.cold_fluid,
            &self.material,
        )?;
        let substitutions = layer.substitutions(&request.overrides)?;

        if let Some(warm) = &request.warm_start {
            if warm.len() != layer.table.len() {
                return Err(DesignError::InvalidInput {
                    reason: format!(
                        "warm start has {} values but the model has {} variables",
                        warm.len(),
                        layer.table.len()
                    ),
                });
            }
        }

        let objective = layer.objective();
        let solution = sca::solve(
            &layer.table,
            &objective,
            &layer.constraints,
            &substitutions,
            request.warm_start.as_ref(),
            &self.oracle,
            &self.sca,
        )?;

        let warnings = layer.correlation_warnings(&solution.point);
        let cache_key = CacheKey::new(self.n_hot, self.n_cold, &substitutions);
        let values: BTreeMap<String, f64> = layer
            .table
            .iter()
            .map(|(var, def)| (def.name.clone(), solution.point.get(var)))
            .collect();
        let report = solution_table(&layer.table, &solution.point);

        Ok(SolvedDesign {
            id: request.id.clone(),
            total_heat: Power::new::<watt>(solution.point.get(layer.total_heat)),
            status: solution.status,
            iterations: solution.iterations,
            warnings,
            cache_key,
            point: solution.point,
            values,
            report,
        })
    }
}

impl Model for CrossflowHx {
    type Input = DesignRequest;
    type Output = SolvedDesign;
    type Error = DesignError;

    fn call(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
        self.design(input)
    }
}

/// One sizing request.
///
/// The identifier is caller-supplied; nothing in the crate issues or
/// increments identifiers behind the caller's back.
#[derive(Debug, Clone)]
pub struct DesignRequest {
    pub id: String,
    /// `(parameter name, value)` pairs layered over the defaults.
    pub overrides: Vec<(String, f64)>,
    /// A previous solution to seed the refinement loop.
    pub warm_start: Option<DesignPoint>,
}

impl DesignRequest {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            overrides: Vec::new(),
            warm_start: None,
        }
    }

    #[must_use]
    pub fn with_override(mut self, name: impl Into<String>, value: f64) -> Self {
        self.overrides.push((name.into(), value));
        self
    }

    #[must_use]
    pub fn with_warm_start(mut self, point: DesignPoint) -> Self {
        self.warm_start = Some(point);
        self
    }
}

/// A solved (or best-known) design.
#[derive(Debug, Clone)]
pub struct SolvedDesign {
    pub id: String,
    pub total_heat: Power,
    pub status: ScaStatus,
    pub iterations: u32,
    pub warnings: Vec<ModelingWarning>,
    /// Key for storing `point` in a [`sca::WarmStartCache`].
    pub cache_key: CacheKey,
    /// The full assignment, usable as a warm start for a like-shaped model.
    pub point: DesignPoint,
    values: BTreeMap<String, f64>,
    report: String,
}

impl SolvedDesign {
    /// Looks up a solved value by variable name.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// The textual table of every variable, value, and unit.
    #[must_use]
    pub fn report(&self) -> &str {
        &self.report
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::support::sca::WarmStartCache;

    use super::*;

    fn fixture(n_hot: usize, n_cold: usize) -> CrossflowHx {
        CrossflowHx::new(
            n_hot,
            n_cold,
            Fluid::water(),
            Fluid::air(),
            Material::stainless_steel(),
        )
        .expect("valid configuration")
    }

    fn cell_heat_sum(design: &SolvedDesign, n_hot: usize, n_cold: usize) -> f64 {
        (0..n_hot)
            .flat_map(|i| (0..n_cold).map(move |j| (i, j)))
            .map(|(i, j)| {
                design
                    .value(&format!("cell[{i}][{j}].dQ"))
                    .expect("cell heat is reported")
            })
            .sum()
    }

    #[test]
    fn zero_channel_count_is_rejected() {
        let result = CrossflowHx::new(
            0,
            3,
            Fluid::water(),
            Fluid::air(),
            Material::stainless_steel(),
        );
        assert!(matches!(result, Err(DesignError::InvalidInput { .. })));
    }

    #[test]
    fn unknown_override_is_rejected_before_solving() {
        let hx = fixture(2, 2);
        let request = DesignRequest::new("bad").with_override("hot.T_inn", 500.0);
        assert!(matches!(
            hx.design(&request),
            Err(DesignError::InvalidInput { .. })
        ));
    }

    #[test]
    fn default_three_by_three_design_converges() {
        let hx = fixture(3, 3);
        let design = hx
            .design(&DesignRequest::new("fixture-3x3"))
            .expect("default fixture solves");

        assert_eq!(design.status, ScaStatus::Converged);
        assert!(design.iterations <= 10, "took {}", design.iterations);
        assert!(design.total_heat.get::<watt>() > 0.0);
        assert!(design.warnings.is_empty(), "{:?}", design.warnings);

        // Heat conservation: the balance holds as an inequality everywhere
        // and is tight at convergence.
        let q = design.value("Q").expect("total heat");
        let cell_sum = cell_heat_sum(&design, 3, 3);
        assert!(q <= cell_sum * (1.0 + 1e-6));
        assert_relative_eq!(q, cell_sum, max_relative = 1e-3);

        // Thermal monotonicity across every cell's stack.
        for i in 0..3 {
            for j in 0..3 {
                let t = |what: &str| {
                    design
                        .value(&format!("cell[{i}][{j}].{what}"))
                        .expect("cell temperature")
                };
                let stack = [
                    t("T_hot"),
                    t("T_film_hot"),
                    t("T_wall"),
                    t("T_film_cold"),
                    t("T_cold"),
                ];
                assert!(
                    stack.windows(2).all(|w| w[0] >= w[1] - 1e-6),
                    "cell[{i}][{j}] stack out of order: {stack:?}"
                );
            }
        }

        // Temperature monotone along every channel, per each side's flag.
        for i in 0..3 {
            let hot: Vec<f64> = (0..=3)
                .map(|s| design.value(&format!("hot.T[{i}][{s}]")).expect("hot T"))
                .collect();
            assert!(hot.windows(2).all(|w| w[0] > w[1]), "hot[{i}]: {hot:?}");

            let cold: Vec<f64> = (0..=3)
                .map(|s| design.value(&format!("cold.T[{i}][{s}]")).expect("cold T"))
                .collect();
            assert!(cold.windows(2).all(|w| w[0] < w[1]), "cold[{i}]: {cold:?}");
        }

        // Grid linking symmetry: summing a cell row's x-widths recovers the
        // hot channel's flow length, and a column's y-widths the cold one's.
        for i in 0..3 {
            let row: f64 = (0..3)
                .map(|j| design.value(&format!("cell[{i}][{j}].x_w")).expect("x_w"))
                .sum();
            let flow: f64 = (0..3)
                .map(|s| design.value(&format!("hot.l[{i}][{s}]")).expect("length"))
                .sum();
            assert_relative_eq!(row, flow, max_relative = 1e-6);
        }
        for j in 0..3 {
            let column: f64 = (0..3)
                .map(|i| design.value(&format!("cell[{i}][{j}].y_w")).expect("y_w"))
                .sum();
            let flow: f64 = (0..3)
                .map(|s| design.value(&format!("cold.l[{j}][{s}]")).expect("length"))
                .sum();
            assert_relative_eq!(column, flow, max_relative = 1e-6);
        }

        // The report carries the headline variable.
        assert!(design.report().lines().any(|line| line.starts_with('Q')));
    }

    #[test]
    fn warm_started_redesign_reconverges_within_two_iterations() {
        let hx = fixture(3, 3);
        let mut cache = WarmStartCache::new();

        let first = hx.design(&DesignRequest::new("cold-start")).expect("solves");
        cache.insert(first.cache_key, first.point.clone());

        let warm = cache
            .get(&first.cache_key)
            .cloned()
            .expect("cached warm start");
        let second = hx
            .design(&DesignRequest::new("warm-start").with_warm_start(warm))
            .expect("solves");

        assert_eq!(second.status, ScaStatus::Converged);
        assert!(second.iterations <= 2, "took {}", second.iterations);
        assert_relative_eq!(
            second.total_heat.get::<watt>(),
            first.total_heat.get::<watt>(),
            max_relative = 1e-3
        );
    }

    #[test]
    fn overconstrained_envelope_is_infeasible_at_iteration_zero() {
        let hx = fixture(3, 3);

        // A stack allowance below two minimum fin heights plus one gauge
        // cannot hold any cell.
        let request = DesignRequest::new("too-tight").with_override("z_max", 2e-4);
        match hx.design(&request) {
            Err(DesignError::Infeasible { .. }) => {}
            other => panic!("expected Infeasible, got {other:?}"),
        }
    }

    #[test]
    fn refined_grid_keeps_per_cell_heat_comparable() {
        let coarse = fixture(3, 3)
            .design(&DesignRequest::new("coarse"))
            .expect("solves");

        // Double both counts and scale the footprint to match, leaving the
        // per-cell geometry room unchanged.
        let fine = fixture(6, 6)
            .design(
                &DesignRequest::new("fine")
                    .with_override("x_max", 0.10)
                    .with_override("y_max", 0.20),
            )
            .expect("solves");

        let coarse_mean = cell_heat_sum(&coarse, 3, 3) / 9.0;
        let fine_mean = cell_heat_sum(&fine, 6, 6) / 36.0;
        assert_relative_eq!(coarse_mean, fine_mean, max_relative = 0.25);
    }
}
