//! One array of parallel rectangular flow channels.
//!
//! Each channel is discretized lengthwise into segments; flow, pressure, and
//! heat-transfer state is tracked per segment with inlet conditions pinned to
//! named parameters. Temperature is monotone along the flow direction:
//! strictly increasing for a heated array, strictly decreasing for a cooled
//! one. The direction is fixed at construction and never changes.

use crate::support::gp::{Constraint, Monomial, Posynomial, Var, VarTable};
use crate::support::props::Fluid;

/// Reference Reynolds number of the channel correlations.
const RE_REF: f64 = 90550.0;
/// Channel effectiveness at the reference point.
const ETA_REF: f64 = 0.917;
/// Pressure-drop parameter at the reference point.
const PF_REF: f64 = 21.66;

/// Effectiveness fit: `eta / ETA_REF = 0.799 (Re / RE_REF)^-0.0296`.
const ETA_FIT_COEFF: f64 = 0.799;
const ETA_FIT_EXP: f64 = -0.0296;

/// Effectiveness ceiling above which the fit is extrapolating. Checked
/// after the solve, not imposed as a hard constraint.
pub(crate) const ETA_CEILING: f64 = 0.844;

/// Pressure-drop fit:
/// `(Pf / PF_REF)^0.155 >= 0.475 r^0.00121 + 0.0338 r^-0.336`, `r = Re / RE_REF`.
const PF_FIT_EXP: f64 = 0.155;
const PF_FIT_C1: f64 = 0.475;
const PF_FIT_E1: f64 = 0.00121;
const PF_FIT_C2: f64 = 0.0338;
const PF_FIT_E2: f64 = -0.336;

/// Reynolds range over which the channel fits were derived.
pub(crate) const RE_FIT_RANGE: (f64, f64) = (1.0e3, 3.0e5);

/// Dittus-Boelter Nusselt correlation, `Nu = 0.023 Re^0.8 Pr^0.4`.
const NU_COEFF: f64 = 0.023;
const NU_RE_EXP: f64 = 0.8;
const NU_PR_EXP: f64 = 0.4;

const TEMP_BOUNDS: (f64, f64) = (250.0, 700.0);
const WIDTH_BOUNDS: (f64, f64) = (1e-4, 0.5);
const HEIGHT_BOUNDS: (f64, f64) = (5e-4, 0.05);
const VELOCITY_BOUNDS: (f64, f64) = (1e-3, 100.0);
const PRESSURE_BOUNDS: (f64, f64) = (5e4, 5e5);
const AREA_BOUNDS: (f64, f64) = (1e-8, 0.25);
const HEAT_BOUNDS: (f64, f64) = (1e-6, 1e6);

/// Whether the array's fluid gains or loses heat along the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlowDirection {
    /// Temperature strictly increases downstream (the cold side).
    Heated,
    /// Temperature strictly decreases downstream (the hot side).
    Cooled,
}

/// Variable handles for one channel array.
///
/// Outer index is the channel; inner index is the segment (or segment
/// boundary for `temperature`, `velocity`, and `total_pressure`, which hold
/// one extra entry).
// Handles not consumed by the layer remain the typed lookup surface for
// reports and downstream exporters.
#[allow(dead_code)]
#[derive(Debug)]
pub(crate) struct ChannelArray {
    pub side: &'static str,
    pub direction: FlowDirection,
    pub channels: usize,
    pub segments: usize,
    pub fluid: Fluid,

    // Side-level scalars.
    pub height: Var,
    pub drag_total: Var,

    // Parameters, substituted before solving.
    pub t_in: Var,
    pub v_in: Var,
    pub p0_in: Var,
    pub p_out: Var,
    pub rho: Var,
    pub cp: Var,
    pub mu: Var,
    pub k_fluid: Var,

    // Per channel.
    pub width: Vec<Var>,
    pub chan_height: Vec<Var>,
    pub mass_flow: Vec<Var>,
    pub frontal_area: Vec<Var>,
    pub drag: Vec<Var>,

    // Per segment boundary.
    pub temperature: Vec<Vec<Var>>,
    pub velocity: Vec<Vec<Var>>,
    pub total_pressure: Vec<Vec<Var>>,

    // Per segment.
    pub delta_t: Vec<Vec<Var>>,
    pub heat: Vec<Vec<Var>>,
    pub cell_temperature: Vec<Vec<Var>>,
    pub avg_velocity: Vec<Vec<Var>>,
    pub flow_length: Vec<Vec<Var>>,
    pub hyd_diameter: Vec<Vec<Var>>,
    pub seg_volume: Vec<Vec<Var>>,
    pub seg_height: Vec<Vec<Var>>,
    pub wall_temperature: Vec<Vec<Var>>,
    pub effectiveness: Vec<Vec<Var>>,
    pub friction: Vec<Vec<Var>>,
    pub reynolds: Vec<Vec<Var>>,
    pub nusselt: Vec<Vec<Var>>,
    pub film_coeff: Vec<Vec<Var>>,
    pub pressure_drop: Vec<Vec<Var>>,
}

fn m(v: Var) -> Monomial {
    Monomial::var(v)
}

impl ChannelArray {
    /// Registers the array's variables and emits its constraint set.
    #[allow(clippy::too_many_lines)]
    pub fn build(
        table: &mut VarTable,
        constraints: &mut Vec<Constraint>,
        side: &'static str,
        channels: usize,
        segments: usize,
        fluid: &Fluid,
        direction: FlowDirection,
    ) -> Self {
        let t_init = match direction {
            FlowDirection::Heated => 350.0,
            FlowDirection::Cooled => 450.0,
        };

        let height = table.var(format!("{side}.h"), "m", 4e-3, HEIGHT_BOUNDS);
        let drag_total = table.var(format!("{side}.D_total"), "N", 0.05, (1e-9, 1e5));

        let t_in = table.var(format!("{side}.T_in"), "K", t_init, TEMP_BOUNDS);
        let v_in = table.var(format!("{side}.v_in"), "m/s", 5.0, VELOCITY_BOUNDS);
        let p0_in = table.var(format!("{side}.P0_in"), "Pa", 1.015e5, PRESSURE_BOUNDS);
        let p_out = table.var(format!("{side}.P_out"), "Pa", 9.5e4, PRESSURE_BOUNDS);
        let rho = table.var(format!("{side}.rho"), "kg/m^3", 1.0, (1e-8, 1e8));
        let cp = table.var(format!("{side}.cp"), "J/(kg*K)", 1.0, (1e-8, 1e8));
        let mu = table.var(format!("{side}.mu"), "Pa*s", 1.0, (1e-12, 1e8));
        let k_fluid = table.var(format!("{side}.k"), "W/(m*K)", 1.0, (1e-8, 1e8));

        let width = table.array(&format!("{side}.w"), "m", 0.01, WIDTH_BOUNDS, channels);
        let chan_height = table.array(&format!("{side}.h_ch"), "m", 4e-3, HEIGHT_BOUNDS, channels);
        let mass_flow = table.array(&format!("{side}.mdot"), "kg/s", 1e-3, (1e-8, 50.0), channels);
        let frontal_area = table.array(&format!("{side}.A_fr"), "m^2", 4e-5, AREA_BOUNDS, channels);
        let drag = table.array(&format!("{side}.D"), "N", 0.01, (1e-9, 1e5), channels);

        let per_boundary =
            |table: &mut VarTable, what: &str, unit, init, bounds| -> Vec<Vec<Var>> {
                (0..channels)
                    .map(|i| {
                        table.array(&format!("{side}.{what}[{i}]"), unit, init, bounds, segments + 1)
                    })
                    .collect()
            };
        let per_segment = |table: &mut VarTable, what: &str, unit, init, bounds| -> Vec<Vec<Var>> {
            (0..channels)
                .map(|i| table.array(&format!("{side}.{what}[{i}]"), unit, init, bounds, segments))
                .collect()
        };

        let temperature = per_boundary(&mut *table, "T", "K", t_init, TEMP_BOUNDS);
        let velocity = per_boundary(&mut *table, "v", "m/s", 5.0, VELOCITY_BOUNDS);
        let total_pressure = per_boundary(&mut *table, "P0", "Pa", 1.013e5, PRESSURE_BOUNDS);

        let delta_t = per_segment(&mut *table, "dT", "K", 5.0, (1e-3, 300.0));
        let heat = per_segment(&mut *table, "dQ", "W", 10.0, HEAT_BOUNDS);
        let cell_temperature = per_segment(&mut *table, "T_cell", "K", t_init, TEMP_BOUNDS);
        let avg_velocity = per_segment(&mut *table, "v_avg", "m/s", 5.0, VELOCITY_BOUNDS);
        let flow_length = per_segment(&mut *table, "l", "m", 0.02, WIDTH_BOUNDS);
        let hyd_diameter = per_segment(&mut *table, "d_h", "m", 5e-3, (1e-4, 0.2));
        let seg_volume = per_segment(&mut *table, "vol", "m^3", 1e-6, (1e-12, 0.125));
        let seg_height = per_segment(&mut *table, "h_seg", "m", 4e-3, HEIGHT_BOUNDS);
        let wall_temperature = per_segment(&mut *table, "T_w", "K", 400.0, TEMP_BOUNDS);
        let effectiveness = per_segment(&mut *table, "eta", "-", 0.8, (1e-3, 2.0));
        let friction = per_segment(&mut *table, "Pf", "-", 0.5, (1e-3, 1e3));
        let reynolds = per_segment(&mut *table, "Re", "-", 8e3, (1.0, 1e7));
        let nusselt = per_segment(&mut *table, "Nu", "-", 30.0, (0.1, 1e4));
        let film_coeff = per_segment(&mut *table, "h_conv", "W/(m^2*K)", 500.0, (0.1, 1e6));
        let pressure_drop = per_segment(&mut *table, "dP", "Pa", 100.0, (1e-4, 1e5));

        // Prandtl number expressed through the property parameters so fluid
        // overrides flow straight into the correlation.
        let prandtl = (m(cp) * m(mu) / m(k_fluid)).pow(NU_PR_EXP);
        let eta_fit = Monomial::constant(ETA_REF * ETA_FIT_COEFF * RE_REF.powf(-ETA_FIT_EXP));
        let pf_fit_1 = Monomial::constant(PF_FIT_C1 * RE_REF.powf(-PF_FIT_E1));
        let pf_fit_2 = Monomial::constant(PF_FIT_C2 * RE_REF.powf(-PF_FIT_E2));

        for i in 0..channels {
            let tag = format!("{side} ch{i}");
            constraints.push(Constraint::equality(
                format!("{tag}: inlet temperature"),
                m(temperature[i][0]),
                m(t_in),
            ));
            constraints.push(Constraint::equality(
                format!("{tag}: inlet velocity"),
                m(velocity[i][0]),
                m(v_in),
            ));
            constraints.push(Constraint::equality(
                format!("{tag}: inlet total pressure"),
                m(total_pressure[i][0]),
                m(p0_in),
            ));
            constraints.push(Constraint::leq(
                format!("{tag}: outlet pressure floor"),
                m(p_out),
                m(total_pressure[i][segments]),
            ));
            constraints.push(Constraint::equality(
                format!("{tag}: frontal area"),
                m(frontal_area[i]),
                m(width[i]) * m(chan_height[i]),
            ));
            constraints.push(Constraint::equality(
                format!("{tag}: uniform height"),
                m(chan_height[i]),
                m(height),
            ));

            // Density is held at inlet conditions, so continuity pins every
            // boundary velocity to the same value.
            for s in 0..=segments {
                constraints.push(Constraint::equality(
                    format!("{tag}: continuity at boundary {s}"),
                    m(mass_flow[i]),
                    m(rho) * m(velocity[i][s]) * m(frontal_area[i]),
                ));
            }

            for s in 0..segments {
                let seg = format!("{tag} seg{s}");
                let (upstream, downstream) = (temperature[i][s], temperature[i][s + 1]);

                match direction {
                    FlowDirection::Heated => constraints.push(Constraint::leq(
                        format!("{seg}: temperature rise"),
                        m(upstream) + m(delta_t[i][s]),
                        m(downstream),
                    )),
                    FlowDirection::Cooled => constraints.push(Constraint::leq(
                        format!("{seg}: temperature drop"),
                        m(downstream) + m(delta_t[i][s]),
                        m(upstream),
                    )),
                }

                constraints.push(Constraint::leq(
                    format!("{seg}: segment energy"),
                    m(heat[i][s]),
                    m(mass_flow[i]) * m(cp) * m(delta_t[i][s]),
                ));

                // Effectiveness limits the approach to the wall-interface
                // temperature, with the upstream bulk as the driver.
                let reach = m(effectiveness[i][s]) * m(mass_flow[i]) * m(cp);
                match direction {
                    FlowDirection::Heated => constraints.push(Constraint::leq(
                        format!("{seg}: effectiveness cap"),
                        m(heat[i][s]) + reach.clone() * m(upstream),
                        reach.clone() * m(wall_temperature[i][s]),
                    )),
                    FlowDirection::Cooled => constraints.push(Constraint::leq(
                        format!("{seg}: effectiveness cap"),
                        m(heat[i][s]) + reach.clone() * m(wall_temperature[i][s]),
                        reach.clone() * m(upstream),
                    )),
                }
                constraints.push(Constraint::equality(
                    format!("{seg}: effectiveness fit"),
                    m(effectiveness[i][s]),
                    eta_fit.clone() * m(reynolds[i][s]).pow(ETA_FIT_EXP),
                ));

                // Downstream boundary stands in for the segment average; it
                // is the conservative end on both sides.
                constraints.push(Constraint::equality(
                    format!("{seg}: cell-side temperature"),
                    m(cell_temperature[i][s]),
                    m(downstream),
                ));
                constraints.push(Constraint::equality(
                    format!("{seg}: segment height"),
                    m(seg_height[i][s]),
                    m(chan_height[i]),
                ));
                constraints.push(Constraint::equality(
                    format!("{seg}: average velocity"),
                    m(avg_velocity[i][s]),
                    m(velocity[i][s + 1]),
                ));
                constraints.push(Constraint::equality(
                    format!("{seg}: segment volume"),
                    m(seg_volume[i][s]),
                    m(frontal_area[i]) * m(flow_length[i][s]),
                ));

                // Relaxed toward the true 2wh/(w+h); tight whenever a larger
                // diameter is favorable, which the friction fit guarantees.
                constraints.push(Constraint::leq(
                    format!("{seg}: hydraulic diameter"),
                    m(chan_height[i]).recip() * 0.5 + m(width[i]).recip() * 0.5,
                    m(hyd_diameter[i][s]).recip(),
                ));

                constraints.push(Constraint::equality(
                    format!("{seg}: Reynolds number"),
                    m(reynolds[i][s]),
                    m(rho) * m(avg_velocity[i][s]) * m(hyd_diameter[i][s]) / m(mu),
                ));
                constraints.push(Constraint::equality(
                    format!("{seg}: Nusselt correlation"),
                    m(nusselt[i][s]),
                    Monomial::constant(NU_COEFF)
                        * m(reynolds[i][s]).pow(NU_RE_EXP)
                        * prandtl.clone(),
                ));
                constraints.push(Constraint::equality(
                    format!("{seg}: film coefficient"),
                    m(film_coeff[i][s]),
                    m(nusselt[i][s]) * m(k_fluid) / m(hyd_diameter[i][s]),
                ));

                constraints.push(Constraint::leq(
                    format!("{seg}: friction fit"),
                    pf_fit_1.clone() * m(reynolds[i][s]).pow(PF_FIT_E1)
                        + pf_fit_2.clone() * m(reynolds[i][s]).pow(PF_FIT_E2),
                    Monomial::constant(PF_REF.powf(-PF_FIT_EXP))
                        * m(friction[i][s]).pow(PF_FIT_EXP),
                ));
                constraints.push(Constraint::equality(
                    format!("{seg}: pressure drop"),
                    m(pressure_drop[i][s]),
                    Monomial::constant(0.5)
                        * m(rho)
                        * m(avg_velocity[i][s]).pow(2.0)
                        * m(friction[i][s]),
                ));
                constraints.push(Constraint::leq(
                    format!("{seg}: total pressure chain"),
                    m(total_pressure[i][s + 1]) + m(pressure_drop[i][s]),
                    m(total_pressure[i][s]),
                ));
            }

            // Drag: inlet dynamic pressure times the friction parameter and
            // frontal area, summed over segments.
            let drag_sum: Posynomial = (0..segments)
                .map(|s| {
                    Monomial::constant(0.5)
                        * m(rho)
                        * m(v_in).pow(2.0)
                        * m(friction[i][s])
                        * m(frontal_area[i])
                })
                .collect();
            constraints.push(Constraint::leq(
                format!("{tag}: channel drag"),
                drag_sum,
                m(drag[i]),
            ));
        }

        let side_drag: Posynomial = drag.iter().map(|&d| m(d)).collect();
        constraints.push(Constraint::leq(
            format!("{side}: total drag"),
            side_drag,
            m(drag_total),
        ));

        Self {
            side,
            direction,
            channels,
            segments,
            fluid: fluid.clone(),
            height,
            drag_total,
            t_in,
            v_in,
            p0_in,
            p_out,
            rho,
            cp,
            mu,
            k_fluid,
            width,
            chan_height,
            mass_flow,
            frontal_area,
            drag,
            temperature,
            velocity,
            total_pressure,
            delta_t,
            heat,
            cell_temperature,
            avg_velocity,
            flow_length,
            hyd_diameter,
            seg_volume,
            seg_height,
            wall_temperature,
            effectiveness,
            friction,
            reynolds,
            nusselt,
            film_coeff,
            pressure_drop,
        }
    }
}
