//! Static fluid and material property records.
//!
//! Properties are plain immutable records constructed once per optimization
//! run; the model treats them as fixed inputs evaluated at inlet conditions
//! rather than state-dependent quantities.

use uom::si::{
    dynamic_viscosity::pascal_second,
    f64::{
        DynamicViscosity, Length, MassDensity, Ratio, SpecificHeatCapacity, ThermalConductivity,
    },
    length::meter,
    mass_density::kilogram_per_cubic_meter,
    specific_heat_capacity::joule_per_kilogram_kelvin,
    thermal_conductivity::watt_per_meter_kelvin,
};

/// A working fluid.
#[derive(Debug, Clone, PartialEq)]
pub struct Fluid {
    pub name: &'static str,
    pub density: MassDensity,
    pub specific_heat: SpecificHeatCapacity,
    pub dynamic_viscosity: DynamicViscosity,
    pub thermal_conductivity: ThermalConductivity,
}

impl Fluid {
    /// Dry air near ambient conditions.
    #[must_use]
    pub fn air() -> Self {
        Self {
            name: "air",
            density: MassDensity::new::<kilogram_per_cubic_meter>(1.2),
            specific_heat: SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(1000.0),
            dynamic_viscosity: DynamicViscosity::new::<pascal_second>(1.81e-5),
            thermal_conductivity: ThermalConductivity::new::<watt_per_meter_kelvin>(0.0262),
        }
    }

    /// Liquid water near ambient conditions.
    #[must_use]
    pub fn water() -> Self {
        Self {
            name: "water",
            density: MassDensity::new::<kilogram_per_cubic_meter>(1000.0),
            specific_heat: SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(4184.0),
            dynamic_viscosity: DynamicViscosity::new::<pascal_second>(8.90e-4),
            thermal_conductivity: ThermalConductivity::new::<watt_per_meter_kelvin>(0.606),
        }
    }

    /// The Prandtl number implied by the record.
    #[must_use]
    pub fn prandtl(&self) -> Ratio {
        self.specific_heat * self.dynamic_viscosity / self.thermal_conductivity
    }
}

/// A structural wall/fin material.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: &'static str,
    pub density: MassDensity,
    pub specific_heat: SpecificHeatCapacity,
    pub thermal_conductivity: ThermalConductivity,
    /// Minimum manufacturable plate/fin thickness.
    pub min_gauge: Length,
}

impl Material {
    #[must_use]
    pub fn stainless_steel() -> Self {
        Self {
            name: "stainless steel",
            density: MassDensity::new::<kilogram_per_cubic_meter>(7700.0),
            specific_heat: SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(500.0),
            thermal_conductivity: ThermalConductivity::new::<watt_per_meter_kelvin>(19.0),
            min_gauge: Length::new::<meter>(1.0e-4),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use uom::si::ratio::ratio;

    use super::*;

    #[test]
    fn air_prandtl_number_is_near_standard() {
        assert_relative_eq!(
            Fluid::air().prandtl().get::<ratio>(),
            0.691,
            max_relative = 1e-2
        );
    }

    #[test]
    fn water_prandtl_number_is_near_standard() {
        assert_relative_eq!(
            Fluid::water().prandtl().get::<ratio>(),
            6.14,
            max_relative = 1e-2
        );
    }
}
