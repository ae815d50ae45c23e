//! Layer composition: two orthogonal channel arrays, one contact grid.
//!
//! The layer owns one hot (cooled) array, one cold (heated) array, the cell
//! grid, and the shared material, and emits everything that couples them:
//! the per-cell linking equalities, the global heat balance, and the
//! envelope, volume, solidity, and drag aggregates.
//!
//! Orientation is fixed by the grid convention (row = hot channel, column =
//! cold channel): hot channels flow along x, so hot channel `i`'s segment
//! `j` is its crossing with cold channel `j`, and cold channel `j`'s segment
//! `i` is its crossing with hot channel `i`. Every linking equality below is
//! written through that single convention.

use std::collections::BTreeMap;

use uom::si::{
    dynamic_viscosity::pascal_second, length::meter, mass_density::kilogram_per_cubic_meter,
    specific_heat_capacity::joule_per_kilogram_kelvin, thermal_conductivity::watt_per_meter_kelvin,
};

use crate::support::gp::{Constraint, DesignPoint, Monomial, Posynomial, Var, VarTable};
use crate::support::props::{Fluid, Material};

use super::channel::{ChannelArray, FlowDirection, ETA_CEILING, RE_FIT_RANGE};
use super::error::{DesignError, ModelingWarning};
use super::grid::ContactCellGrid;
use super::params::ParameterMap;

const STD_ATMOSPHERE: f64 = 101_325.0;

/// Default inlet velocities, m/s.
const DEFAULT_HOT_V_IN: f64 = 1.0;
const DEFAULT_COLD_V_IN: f64 = 20.0;

fn m(v: Var) -> Monomial {
    Monomial::var(v)
}

/// One assembled cross-flow layer, ready to substitute and solve.
#[derive(Debug)]
pub(crate) struct Layer {
    pub table: VarTable,
    pub constraints: Vec<Constraint>,
    pub hot: ChannelArray,
    pub cold: ChannelArray,
    pub grid: ContactCellGrid,
    pub params: ParameterMap,

    // Global scalars.
    pub total_heat: Var,
    pub x_len: Var,
    pub y_len: Var,
    pub stack_height: Var,
    pub volume: Var,
    pub mat_volume: Var,
    pub solidity: Var,

    // Envelope parameters.
    pub x_max: Var,
    pub y_max: Var,
    pub z_max: Var,
    pub max_solidity: Var,
    pub t_max_wall: Var,
}

impl Layer {
    /// Builds the full coupled model for an `n_hot` by `n_cold` layer.
    ///
    /// # Errors
    ///
    /// Returns [`DesignError::InvalidInput`] when either channel count is
    /// zero.
    #[allow(clippy::too_many_lines)]
    pub fn build(
        n_hot: usize,
        n_cold: usize,
        hot_fluid: &Fluid,
        cold_fluid: &Fluid,
        material: &Material,
    ) -> Result<Self, DesignError> {
        if n_hot == 0 || n_cold == 0 {
            return Err(DesignError::InvalidInput {
                reason: format!("channel counts must be positive, got {n_hot} by {n_cold}"),
            });
        }

        let mut table = VarTable::new();
        let mut constraints = Vec::new();

        // Hot channels are cooled and carry `n_cold` segments, one per
        // crossing; the cold side mirrors that.
        let hot = ChannelArray::build(
            &mut table,
            &mut constraints,
            "hot",
            n_hot,
            n_cold,
            hot_fluid,
            FlowDirection::Cooled,
        );
        let cold = ChannelArray::build(
            &mut table,
            &mut constraints,
            "cold",
            n_cold,
            n_hot,
            cold_fluid,
            FlowDirection::Heated,
        );
        let grid = ContactCellGrid::build(&mut table, &mut constraints, n_hot, n_cold, material);

        let total_heat = table.var("Q", "W", 100.0, (1e-6, 1e7));
        let x_len = table.var("x_len", "m", 0.05, (1e-4, 1.0));
        let y_len = table.var("y_len", "m", 0.1, (1e-4, 1.0));
        let stack_height = table.var("stack_height", "m", 9e-3, (1e-4, 0.5));
        let volume = table.var("volume", "m^3", 4.5e-5, (1e-12, 0.5));
        let mat_volume = table.var("mat_volume", "m^3", 3e-6, (1e-15, 0.5));
        let solidity = table.var("solidity", "-", 0.07, (1e-6, 1.0));

        let x_max = table.var("x_max", "m", 0.05, (1e-4, 1.0));
        let y_max = table.var("y_max", "m", 0.1, (1e-4, 1.0));
        let z_max = table.var("z_max", "m", 0.01, (1e-4, 0.5));
        let max_solidity = table.var("max_solidity", "-", 0.7, (1e-3, 1.0));
        let t_max_wall = table.var("T_max_wall", "K", 450.0, (250.0, 700.0));

        // The many-to-many linking set. Each cell's geometry and state is
        // pinned to the crossing segments of both arrays.
        for i in 0..n_hot {
            for j in 0..n_cold {
                let c = grid.cell(i, j);
                let tag = format!("link[{i}][{j}]");
                let pairs = [
                    ("x-width", grid.x_width[c], cold.width[j]),
                    ("y-width", grid.y_width[c], hot.width[i]),
                    ("hot flow length", hot.flow_length[i][j], grid.x_width[c]),
                    ("cold flow length", cold.flow_length[j][i], grid.y_width[c]),
                    ("hot heat", grid.heat[c], hot.heat[i][j]),
                    ("cold heat", grid.heat[c], cold.heat[j][i]),
                    ("hot side temperature", grid.t_hot_side[c], hot.cell_temperature[i][j]),
                    ("cold side temperature", grid.t_cold_side[c], cold.cell_temperature[j][i]),
                    ("hot film temperature", grid.t_film_hot[c], hot.wall_temperature[i][j]),
                    ("cold film temperature", grid.t_film_cold[c], cold.wall_temperature[j][i]),
                    ("hot film coefficient", grid.film_coeff_hot[c], hot.film_coeff[i][j]),
                    ("cold film coefficient", grid.film_coeff_cold[c], cold.film_coeff[j][i]),
                    ("hot fin height", grid.fin_height_hot[c], hot.seg_height[i][j]),
                    ("cold fin height", grid.fin_height_cold[c], cold.seg_height[j][i]),
                ];
                for (what, lhs, rhs) in pairs {
                    constraints.push(Constraint::equality(
                        format!("{tag}: {what}"),
                        m(lhs),
                        m(rhs),
                    ));
                }

                constraints.push(Constraint::leq(
                    format!("cell[{i}][{j}]: stack height"),
                    m(grid.fin_height_hot[c])
                        + m(grid.fin_height_cold[c])
                        + m(grid.plate_thickness[c]),
                    m(stack_height),
                ));
                constraints.push(Constraint::leq(
                    format!("cell[{i}][{j}]: wall temperature cap"),
                    m(grid.t_wall[c]),
                    m(t_max_wall),
                ));
            }
        }

        // The one genuinely signomial relation: total heat against the sum
        // of per-cell heat. As the per-cell distribution evens out the local
        // monomial fit of the sum approaches the sum itself, which is why
        // the refinement loop settles in a few solves.
        let cell_heat: Posynomial = grid.heat.iter().map(|&h| m(h)).collect();
        constraints.push(Constraint::leq("heat balance", m(total_heat), cell_heat));

        // Envelope and aggregates.
        constraints.push(Constraint::leq(
            "cold widths within x length",
            cold.width.iter().map(|&w| m(w)).collect::<Posynomial>(),
            m(x_len),
        ));
        constraints.push(Constraint::leq(
            "hot widths within y length",
            hot.width.iter().map(|&w| m(w)).collect::<Posynomial>(),
            m(y_len),
        ));
        constraints.push(Constraint::leq("x envelope", m(x_len), m(x_max)));
        constraints.push(Constraint::leq("y envelope", m(y_len), m(y_max)));
        constraints.push(Constraint::leq("z envelope", m(stack_height), m(z_max)));
        constraints.push(Constraint::equality(
            "enclosed volume",
            m(volume),
            m(x_len) * m(y_len) * m(stack_height),
        ));
        constraints.push(Constraint::leq(
            "material volume",
            grid.mat_volume.iter().map(|&v| m(v)).collect::<Posynomial>(),
            m(mat_volume),
        ));
        constraints.push(Constraint::equality(
            "solidity",
            m(solidity),
            m(mat_volume) / m(volume),
        ));
        constraints.push(Constraint::leq(
            "solidity cap",
            m(solidity),
            m(max_solidity),
        ));

        let mut params = ParameterMap::new();
        for (name, var) in [
            ("hot.T_in", hot.t_in),
            ("hot.v_in", hot.v_in),
            ("hot.P0_in", hot.p0_in),
            ("hot.P_out", hot.p_out),
            ("hot.rho", hot.rho),
            ("hot.cp", hot.cp),
            ("hot.mu", hot.mu),
            ("hot.k", hot.k_fluid),
            ("cold.T_in", cold.t_in),
            ("cold.v_in", cold.v_in),
            ("cold.P0_in", cold.p0_in),
            ("cold.P_out", cold.p_out),
            ("cold.rho", cold.rho),
            ("cold.cp", cold.cp),
            ("cold.mu", cold.mu),
            ("cold.k", cold.k_fluid),
            ("n_fins", grid.n_fins),
            ("material.k", grid.k_mat),
            ("material.min_gauge", grid.min_gauge),
            ("aspect_max", grid.aspect_max),
            ("x_max", x_max),
            ("y_max", y_max),
            ("z_max", z_max),
            ("max_solidity", max_solidity),
            ("T_max_wall", t_max_wall),
        ] {
            params.register(name, var);
        }

        Ok(Self {
            table,
            constraints,
            hot,
            cold,
            grid,
            params,
            total_heat,
            x_len,
            y_len,
            stack_height,
            volume,
            mat_volume,
            solidity,
            x_max,
            y_max,
            z_max,
            max_solidity,
            t_max_wall,
        })
    }

    /// Maximizing heat means minimizing its reciprocal.
    #[must_use]
    pub fn objective(&self) -> Posynomial {
        Monomial::var(self.total_heat).recip().into()
    }

    /// The baseline operating point: inlet conditions, envelope, fin count,
    /// and the property values of the records the layer was built with.
    #[must_use]
    pub fn default_substitutions(&self) -> Vec<(String, f64)> {
        let mut defaults = Vec::new();

        for (array, t_in, v_in) in [
            (&self.hot, 500.0, DEFAULT_HOT_V_IN),
            (&self.cold, 303.0, DEFAULT_COLD_V_IN),
        ] {
            let side = array.side;
            let rho = array.fluid.density.get::<kilogram_per_cubic_meter>();
            defaults.push((format!("{side}.T_in"), t_in));
            defaults.push((format!("{side}.v_in"), v_in));
            defaults.push((
                format!("{side}.P0_in"),
                STD_ATMOSPHERE + 0.5 * rho * v_in * v_in,
            ));
            defaults.push((format!("{side}.P_out"), 9.5e4));
            defaults.push((format!("{side}.rho"), rho));
            defaults.push((
                format!("{side}.cp"),
                array.fluid.specific_heat.get::<joule_per_kilogram_kelvin>(),
            ));
            defaults.push((
                format!("{side}.mu"),
                array.fluid.dynamic_viscosity.get::<pascal_second>(),
            ));
            defaults.push((
                format!("{side}.k"),
                array.fluid.thermal_conductivity.get::<watt_per_meter_kelvin>(),
            ));
        }

        defaults.push(("n_fins".to_string(), 4.0));
        defaults.push((
            "material.k".to_string(),
            self.grid.material.thermal_conductivity.get::<watt_per_meter_kelvin>(),
        ));
        defaults.push((
            "material.min_gauge".to_string(),
            self.grid.material.min_gauge.get::<meter>(),
        ));
        defaults.push(("aspect_max".to_string(), 10.0));
        defaults.push(("x_max".to_string(), 0.05));
        defaults.push(("y_max".to_string(), 0.10));
        defaults.push(("z_max".to_string(), 0.01));
        defaults.push(("max_solidity".to_string(), 0.7));
        defaults.push(("T_max_wall".to_string(), 450.0));

        defaults
    }

    /// Resolves the default substitutions merged with caller overrides.
    ///
    /// # Errors
    ///
    /// Returns [`DesignError::InvalidInput`] for an unknown parameter name
    /// or a non-finite or non-positive value.
    pub fn substitutions(
        &self,
        overrides: &[(String, f64)],
    ) -> Result<BTreeMap<Var, f64>, DesignError> {
        let mut out = BTreeMap::new();
        for (name, value) in self.default_substitutions() {
            let var = self
                .params
                .get(&name)
                .expect("defaults cover registered parameters only");
            out.insert(var, value);
        }
        for (name, value) in overrides {
            let var = self.params.get(name).ok_or_else(|| DesignError::InvalidInput {
                reason: format!("unknown design parameter `{name}`"),
            })?;
            if !value.is_finite() || *value <= 0.0 {
                return Err(DesignError::InvalidInput {
                    reason: format!("design parameter `{name}` must be positive, got {value}"),
                });
            }
            out.insert(var, *value);
        }
        Ok(out)
    }

    /// Post-solve sanity checks against the correlations' validated domains.
    ///
    /// These never abort: a design outside the fitted range is returned with
    /// warnings attached so the caller can judge the extrapolation.
    #[must_use]
    pub fn correlation_warnings(&self, point: &DesignPoint) -> Vec<ModelingWarning> {
        let (re_lo, re_hi) = RE_FIT_RANGE;
        let mut warnings = Vec::new();
        for array in [&self.hot, &self.cold] {
            for channel in &array.reynolds {
                for &re in channel {
                    let value = point.get(re);
                    if !(re_lo..=re_hi).contains(&value) {
                        warnings.push(ModelingWarning::CorrelationOutOfRange {
                            variable: self.table.def(re).name.clone(),
                            value,
                            lower: re_lo,
                            upper: re_hi,
                        });
                    }
                }
            }
            for channel in &array.effectiveness {
                for &eta in channel {
                    let value = point.get(eta);
                    if value > ETA_CEILING {
                        warnings.push(ModelingWarning::CorrelationOutOfRange {
                            variable: self.table.def(eta).name.clone(),
                            value,
                            lower: 0.0,
                            upper: ETA_CEILING,
                        });
                    }
                }
            }
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use crate::support::gp::ConstraintClass;

    use super::*;

    fn build_layer(n_hot: usize, n_cold: usize) -> Layer {
        Layer::build(
            n_hot,
            n_cold,
            &Fluid::water(),
            &Fluid::air(),
            &Material::stainless_steel(),
        )
        .expect("layer builds")
    }

    #[test]
    fn rejects_zero_channel_counts() {
        let result = Layer::build(
            0,
            3,
            &Fluid::water(),
            &Fluid::air(),
            &Material::stainless_steel(),
        );
        assert!(matches!(result, Err(DesignError::InvalidInput { .. })));
    }

    #[test]
    fn heat_balance_is_the_only_signomial() {
        let layer = build_layer(2, 3);
        let signomials: Vec<&Constraint> = layer
            .constraints
            .iter()
            .filter(|c| c.class() == ConstraintClass::Signomial)
            .collect();
        assert_eq!(signomials.len(), 1);
        assert_eq!(signomials[0].label(), "heat balance");
    }

    #[test]
    fn linking_covers_every_cell_in_both_orientations() {
        let n_hot = 2;
        let n_cold = 3;
        let layer = build_layer(n_hot, n_cold);

        let links = layer
            .constraints
            .iter()
            .filter(|c| c.label().starts_with("link["))
            .count();
        assert_eq!(links, 14 * n_hot * n_cold);

        // An off-diagonal cell must pick up the transposed indices: cell
        // (1, 0) pairs hot channel 1's segment 0 with cold channel 0's
        // segment 1.
        let c = layer.grid.cell(1, 0);
        let mut point = layer.table.initial_point();
        point.set(layer.cold.width[0], 0.011);
        point.set(layer.grid.x_width[c], 0.011);
        point.set(layer.hot.heat[1][0], 7.0);
        point.set(layer.cold.heat[0][1], 7.0);
        point.set(layer.grid.heat[c], 7.0);

        for what in ["x-width", "hot heat", "cold heat"] {
            let label = format!("link[1][0]: {what}");
            let link = layer
                .constraints
                .iter()
                .find(|c| c.label() == label)
                .expect("link exists");
            let lhs = link.lhs().eval(&point);
            let rhs = link.rhs().eval(&point);
            assert!(
                (lhs - rhs).abs() < 1e-12,
                "{label} should hold: {lhs} vs {rhs}"
            );
        }
    }

    #[test]
    fn every_default_parameter_is_registered() {
        let layer = build_layer(2, 2);
        for (name, value) in layer.default_substitutions() {
            assert!(layer.params.get(&name).is_some(), "missing `{name}`");
            assert!(value > 0.0, "default `{name}` must be positive");
        }
        let subs = layer.substitutions(&[]).expect("defaults resolve");
        assert_eq!(subs.len(), layer.params.len());
    }

    #[test]
    fn overrides_are_validated() {
        let layer = build_layer(2, 2);

        let unknown = layer.substitutions(&[("bogus".to_string(), 1.0)]);
        assert!(matches!(unknown, Err(DesignError::InvalidInput { .. })));

        let negative = layer.substitutions(&[("z_max".to_string(), -0.01)]);
        assert!(matches!(negative, Err(DesignError::InvalidInput { .. })));

        let ok = layer
            .substitutions(&[("z_max".to_string(), 0.02)])
            .expect("valid override");
        assert_eq!(ok[&layer.z_max], 0.02);
    }

    #[test]
    fn correlation_warnings_flag_out_of_range_reynolds() {
        let layer = build_layer(1, 1);
        let mut point = layer.table.initial_point();

        assert!(layer.correlation_warnings(&point).is_empty());

        point.set(layer.hot.reynolds[0][0], 10.0);
        let warnings = layer.correlation_warnings(&point);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            ModelingWarning::CorrelationOutOfRange { variable, .. }
                if variable == "hot.Re[0][0]"
        ));
    }
}
