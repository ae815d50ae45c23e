//! The 2-D grid of contact cells between the two channel arrays.
//!
//! One cell exists per (hot channel, cold channel) pair. The canonical
//! orientation, applied through [`ContactCellGrid::cell`] everywhere, is:
//! **row `i` = hot channel, column `j` = cold channel**; a cell's x-width is
//! its extent along the hot flow direction (the crossing cold channel's
//! width) and its y-width the extent along the cold flow direction (the hot
//! channel's width). Any other orientation is a bug, not a style choice.
//!
//! Each cell carries a two-sided film/fin heat path: convection at the fin
//! surface on either face, and lumped one-dimensional conduction through the
//! fin bank plus half the separating plate on either side of the internal
//! wall node. The lumping is a first-order approximation, not a full
//! fin-efficiency solve. The same cell heat flows through every element of
//! the series, so whenever it is positive the cell temperatures are strictly
//! ordered hot side > hot film > wall > cold film > cold side.

use crate::support::gp::{Constraint, Monomial, Var, VarTable};
use crate::support::props::Material;

const TEMP_BOUNDS: (f64, f64) = (250.0, 700.0);
const FOOT_BOUNDS: (f64, f64) = (1e-4, 0.5);
const FIN_HEIGHT_BOUNDS: (f64, f64) = (5e-4, 0.05);
const GAUGE_BOUNDS: (f64, f64) = (1e-5, 0.01);

/// Dense row-major index shared by [`ContactCellGrid::cell`] and `build`.
#[inline]
fn cell_index(n_cold: usize, hot: usize, cold: usize) -> usize {
    hot * n_cold + cold
}

/// Variable handles for the cell grid, stored row-major.
// Handles not consumed by the layer remain the typed lookup surface for
// reports and downstream exporters.
#[allow(dead_code)]
#[derive(Debug)]
pub(crate) struct ContactCellGrid {
    pub n_hot: usize,
    pub n_cold: usize,
    pub material: Material,

    // Parameters, substituted before solving.
    pub n_fins: Var,
    pub k_mat: Var,
    pub min_gauge: Var,
    pub aspect_max: Var,

    // Per cell, indexed through `cell`.
    pub x_width: Vec<Var>,
    pub y_width: Vec<Var>,
    pub area: Vec<Var>,
    pub fin_height_hot: Vec<Var>,
    pub fin_height_cold: Vec<Var>,
    pub plate_thickness: Vec<Var>,
    pub fin_thickness_hot: Vec<Var>,
    pub fin_thickness_cold: Vec<Var>,
    pub fin_area_hot: Vec<Var>,
    pub fin_area_cold: Vec<Var>,
    pub film_coeff_hot: Vec<Var>,
    pub film_coeff_cold: Vec<Var>,
    pub t_hot_side: Vec<Var>,
    pub t_cold_side: Vec<Var>,
    pub t_film_hot: Vec<Var>,
    pub t_film_cold: Vec<Var>,
    pub t_wall: Vec<Var>,
    pub heat: Vec<Var>,
    pub mat_volume: Vec<Var>,
}

fn m(v: Var) -> Monomial {
    Monomial::var(v)
}

impl ContactCellGrid {
    /// Dense index of the cell where hot channel `hot` crosses cold channel
    /// `cold`. This is the only place the orientation convention is encoded.
    #[inline]
    #[must_use]
    pub fn cell(&self, hot: usize, cold: usize) -> usize {
        debug_assert!(hot < self.n_hot && cold < self.n_cold);
        cell_index(self.n_cold, hot, cold)
    }

    /// Registers the grid's variables and emits all intra-cell constraints.
    ///
    /// The `material` record is not baked into coefficients; its conductivity
    /// and gauge enter through parameter variables so property overrides stay
    /// possible at substitution time.
    #[allow(clippy::too_many_lines)]
    pub fn build(
        table: &mut VarTable,
        constraints: &mut Vec<Constraint>,
        n_hot: usize,
        n_cold: usize,
        material: &Material,
    ) -> Self {
        let cells = n_hot * n_cold;

        let n_fins = table.var("n_fins", "-", 4.0, (0.5, 100.0));
        let k_mat = table.var("material.k", "W/(m*K)", 19.0, (1e-3, 1e4));
        let min_gauge = table.var("material.min_gauge", "m", 1e-4, (1e-7, 0.01));
        let aspect_max = table.var("aspect_max", "-", 10.0, (1.0, 1e3));

        let cell_array = |table: &mut VarTable, what: &str, unit, init, bounds| -> Vec<Var> {
            (0..n_hot)
                .flat_map(|i| {
                    (0..n_cold)
                        .map(|j| table.var(format!("cell[{i}][{j}].{what}"), unit, init, bounds))
                        .collect::<Vec<_>>()
                })
                .collect()
        };

        let x_width = cell_array(table, "x_w", "m", 0.017, FOOT_BOUNDS);
        let y_width = cell_array(table, "y_w", "m", 0.033, FOOT_BOUNDS);
        let area = cell_array(table, "A", "m^2", 5.6e-4, (1e-8, 0.25));
        let fin_height_hot = cell_array(table, "fh_hot", "m", 4e-3, FIN_HEIGHT_BOUNDS);
        let fin_height_cold = cell_array(table, "fh_cold", "m", 4e-3, FIN_HEIGHT_BOUNDS);
        let plate_thickness = cell_array(table, "t_plate", "m", 5e-4, GAUGE_BOUNDS);
        let fin_thickness_hot = cell_array(table, "t_fin_hot", "m", 5e-4, GAUGE_BOUNDS);
        let fin_thickness_cold = cell_array(table, "t_fin_cold", "m", 5e-4, GAUGE_BOUNDS);
        let fin_area_hot = cell_array(table, "A_fin_hot", "m^2", 5e-4, (1e-10, 1.0));
        let fin_area_cold = cell_array(table, "A_fin_cold", "m^2", 5e-4, (1e-10, 1.0));
        let film_coeff_hot = cell_array(table, "h_hot", "W/(m^2*K)", 3000.0, (0.1, 1e6));
        let film_coeff_cold = cell_array(table, "h_cold", "W/(m^2*K)", 120.0, (0.1, 1e6));
        let t_hot_side = cell_array(table, "T_hot", "K", 450.0, TEMP_BOUNDS);
        let t_cold_side = cell_array(table, "T_cold", "K", 350.0, TEMP_BOUNDS);
        let t_film_hot = cell_array(table, "T_film_hot", "K", 430.0, TEMP_BOUNDS);
        let t_film_cold = cell_array(table, "T_film_cold", "K", 370.0, TEMP_BOUNDS);
        let t_wall = cell_array(table, "T_wall", "K", 400.0, TEMP_BOUNDS);
        let heat = cell_array(table, "dQ", "W", 10.0, (1e-6, 1e6));
        let mat_volume = cell_array(table, "vol_mat", "m^3", 1e-7, (1e-15, 0.1));

        for i in 0..n_hot {
            for j in 0..n_cold {
                let c = cell_index(n_cold, i, j);
                let tag = format!("cell[{i}][{j}]");

                constraints.push(Constraint::equality(
                    format!("{tag}: footprint area"),
                    m(area[c]),
                    m(x_width[c]) * m(y_width[c]),
                ));
                constraints.push(Constraint::leq(
                    format!("{tag}: aspect ratio x/y"),
                    m(x_width[c]),
                    m(aspect_max) * m(y_width[c]),
                ));
                constraints.push(Constraint::leq(
                    format!("{tag}: aspect ratio y/x"),
                    m(y_width[c]),
                    m(aspect_max) * m(x_width[c]),
                ));

                // Hot fins run along x, cold fins along y; both surfaces
                // count the two faces of every fin.
                constraints.push(Constraint::equality(
                    format!("{tag}: hot fin surface"),
                    m(fin_area_hot[c]),
                    Monomial::constant(2.0) * m(n_fins) * m(fin_height_hot[c]) * m(x_width[c]),
                ));
                constraints.push(Constraint::equality(
                    format!("{tag}: cold fin surface"),
                    m(fin_area_cold[c]),
                    Monomial::constant(2.0) * m(n_fins) * m(fin_height_cold[c]) * m(y_width[c]),
                ));

                // The fin bank may fill at most half the crossing width.
                constraints.push(Constraint::leq(
                    format!("{tag}: hot fin blockage"),
                    m(n_fins) * m(fin_thickness_hot[c]),
                    Monomial::constant(0.5) * m(y_width[c]),
                ));
                constraints.push(Constraint::leq(
                    format!("{tag}: cold fin blockage"),
                    m(n_fins) * m(fin_thickness_cold[c]),
                    Monomial::constant(0.5) * m(x_width[c]),
                ));

                for (what, thickness) in [
                    ("plate", plate_thickness[c]),
                    ("hot fin", fin_thickness_hot[c]),
                    ("cold fin", fin_thickness_cold[c]),
                ] {
                    constraints.push(Constraint::leq(
                        format!("{tag}: {what} gauge"),
                        m(min_gauge),
                        m(thickness),
                    ));
                }

                // The series heat path. Convection at each fin surface:
                let hot_conv = m(film_coeff_hot[c]) * m(fin_area_hot[c]);
                constraints.push(Constraint::leq(
                    format!("{tag}: hot convection"),
                    m(heat[c]) + hot_conv.clone() * m(t_film_hot[c]),
                    hot_conv * m(t_hot_side[c]),
                ));
                let cold_conv = m(film_coeff_cold[c]) * m(fin_area_cold[c]);
                constraints.push(Constraint::leq(
                    format!("{tag}: cold convection"),
                    m(heat[c]) + cold_conv.clone() * m(t_cold_side[c]),
                    cold_conv * m(t_film_cold[c]),
                ));

                // Lumped conduction through each fin bank plus half the
                // plate, over the fin-foot cross-section.
                let hot_cond = m(k_mat) * m(n_fins) * m(fin_thickness_hot[c]) * m(x_width[c]);
                constraints.push(Constraint::leq(
                    format!("{tag}: hot fin conduction"),
                    m(heat[c]) * m(fin_height_hot[c])
                        + m(heat[c]) * m(plate_thickness[c]) * 0.5
                        + hot_cond.clone() * m(t_wall[c]),
                    hot_cond * m(t_film_hot[c]),
                ));
                let cold_cond = m(k_mat) * m(n_fins) * m(fin_thickness_cold[c]) * m(y_width[c]);
                constraints.push(Constraint::leq(
                    format!("{tag}: cold fin conduction"),
                    m(heat[c]) * m(fin_height_cold[c])
                        + m(heat[c]) * m(plate_thickness[c]) * 0.5
                        + cold_cond.clone() * m(t_film_cold[c]),
                    cold_cond * m(t_wall[c]),
                ));

                // Plate slab plus both fin banks.
                constraints.push(Constraint::leq(
                    format!("{tag}: material volume"),
                    m(plate_thickness[c]) * m(area[c])
                        + m(n_fins) * m(fin_thickness_hot[c]) * m(fin_height_hot[c]) * m(x_width[c])
                        + m(n_fins)
                            * m(fin_thickness_cold[c])
                            * m(fin_height_cold[c])
                            * m(y_width[c]),
                    m(mat_volume[c]),
                ));
            }
        }

        Self {
            n_hot,
            n_cold,
            material: material.clone(),
            n_fins,
            k_mat,
            min_gauge,
            aspect_max,
            x_width,
            y_width,
            area,
            fin_height_hot,
            fin_height_cold,
            plate_thickness,
            fin_thickness_hot,
            fin_thickness_cold,
            fin_area_hot,
            fin_area_cold,
            film_coeff_hot,
            film_coeff_cold,
            t_hot_side,
            t_cold_side,
            t_film_hot,
            t_film_cold,
            t_wall,
            heat,
            mat_volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::support::gp::ConstraintClass;

    use super::*;

    fn build_grid() -> (VarTable, Vec<Constraint>, ContactCellGrid) {
        let mut table = VarTable::new();
        let mut constraints = Vec::new();
        let grid = ContactCellGrid::build(
            &mut table,
            &mut constraints,
            2,
            3,
            &Material::stainless_steel(),
        );
        (table, constraints, grid)
    }

    #[test]
    fn cell_indexing_is_row_major_hot_by_cold() {
        let (table, _, grid) = build_grid();
        assert_eq!(grid.cell(0, 0), 0);
        assert_eq!(grid.cell(0, 2), 2);
        assert_eq!(grid.cell(1, 0), 3);
        assert_eq!(
            table.def(grid.heat[grid.cell(1, 2)]).name,
            "cell[1][2].dQ"
        );
    }

    #[test]
    fn emits_only_posynomial_constraints() {
        let (_, constraints, _) = build_grid();
        assert!(constraints
            .iter()
            .all(|c| c.class() == ConstraintClass::Posynomial));
    }

    #[test]
    fn series_path_orders_cell_temperatures_when_heat_flows() {
        let (table, constraints, grid) = build_grid();
        let c = grid.cell(0, 1);

        // A point with a strictly ordered thermal stack and modest heat.
        let mut point = table.initial_point();
        point.set(grid.heat[c], 1.0);
        point.set(grid.t_hot_side[c], 460.0);
        point.set(grid.t_film_hot[c], 430.0);
        point.set(grid.t_wall[c], 400.0);
        point.set(grid.t_film_cold[c], 370.0);
        point.set(grid.t_cold_side[c], 340.0);
        point.set(grid.film_coeff_hot[c], 5000.0);
        point.set(grid.film_coeff_cold[c], 500.0);
        point.set(grid.fin_area_hot[c], 1e-3);
        point.set(grid.fin_area_cold[c], 1e-3);

        for label in [
            "cell[0][1]: hot convection",
            "cell[0][1]: cold convection",
        ] {
            let con = constraints
                .iter()
                .find(|c| c.label() == label)
                .expect("series constraint exists");
            assert!(
                con.lhs().eval(&point) <= con.rhs().eval(&point),
                "{label} should hold at an ordered stack"
            );
        }

        // Collapse the gradient: the hot convection element must fail.
        point.set(grid.t_film_hot[c], 460.0);
        let conv = constraints
            .iter()
            .find(|c| c.label() == "cell[0][1]: hot convection")
            .expect("exists");
        assert!(conv.lhs().eval(&point) > conv.rhs().eval(&point));
    }
}
