//! # Vehicle Model
//!
//! Mass properties of the vehicle and the force limits shared by every thruster. Built once at
//! startup from the allocation parameters and never modified afterwards.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Vehicle block of the allocation parameter file.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct VehicleParams {
    /// Mass of the vehicle.
    ///
    /// Units: kilograms
    pub mass_kg: f64,

    /// Principal moment of inertia about the body X axis.
    ///
    /// Units: kilogram meters^2
    pub ixx_kgm2: f64,

    /// Principal moment of inertia about the body Y axis.
    ///
    /// Units: kilogram meters^2
    pub iyy_kgm2: f64,

    /// Principal moment of inertia about the body Z axis.
    ///
    /// Units: kilogram meters^2
    pub izz_kgm2: f64,

    /// Minimum force any thruster can produce (most negative value).
    ///
    /// Units: Newtons
    pub min_thrust_n: f64,

    /// Maximum force any thruster can produce.
    ///
    /// Units: Newtons
    pub max_thrust_n: f64,
}

/// A validated set of vehicle parameters.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct VehicleModel {
    params: VehicleParams,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum VehicleModelError {
    #[error("Vehicle parameter {0} is not finite")]
    NonFinite(&'static str),

    #[error("Vehicle mass must be positive, found {0} kg")]
    NonPositiveMass(f64),

    #[error("Moment of inertia {0} must be positive, found {1} kg m^2")]
    NonPositiveInertia(&'static str, f64),

    #[error("Thrust bounds [{min}, {max}] N are inverted or empty")]
    InvalidThrustBounds {
        min: f64,
        max: f64
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VehicleModel {
    /// Validate the parameters and build the model.
    pub fn new(params: VehicleParams) -> Result<Self, VehicleModelError> {
        let named = [
            ("mass_kg", params.mass_kg),
            ("ixx_kgm2", params.ixx_kgm2),
            ("iyy_kgm2", params.iyy_kgm2),
            ("izz_kgm2", params.izz_kgm2),
            ("min_thrust_n", params.min_thrust_n),
            ("max_thrust_n", params.max_thrust_n),
        ];

        if let Some((name, _)) = named.iter().find(|(_, v)| !v.is_finite()) {
            return Err(VehicleModelError::NonFinite(*name))
        }

        if params.mass_kg <= 0.0 {
            return Err(VehicleModelError::NonPositiveMass(params.mass_kg))
        }

        for &(name, value) in named[1..4].iter() {
            if value <= 0.0 {
                return Err(VehicleModelError::NonPositiveInertia(name, value))
            }
        }

        if params.min_thrust_n >= params.max_thrust_n {
            return Err(VehicleModelError::InvalidThrustBounds {
                min: params.min_thrust_n,
                max: params.max_thrust_n
            })
        }

        Ok(Self { params })
    }

    pub fn mass_kg(&self) -> f64 {
        self.params.mass_kg
    }

    /// Principal moments of inertia as `[Ixx, Iyy, Izz]`.
    pub fn inertia_kgm2(&self) -> [f64; 3] {
        [self.params.ixx_kgm2, self.params.iyy_kgm2, self.params.izz_kgm2]
    }

    /// Thrust bounds as `(min, max)`.
    pub fn thrust_bounds_n(&self) -> (f64, f64) {
        (self.params.min_thrust_n, self.params.max_thrust_n)
    }

    pub fn params(&self) -> &VehicleParams {
        &self.params
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn reference_params() -> VehicleParams {
        VehicleParams {
            mass_kg: 48.8428,
            ixx_kgm2: 0.55649783,
            iyy_kgm2: 1.89075467,
            izz_kgm2: 1.96057706,
            min_thrust_n: -18.0,
            max_thrust_n: 18.0,
        }
    }

    #[test]
    fn test_reference_vehicle_is_valid() {
        let vehicle = VehicleModel::new(reference_params()).unwrap();

        assert_eq!(vehicle.mass_kg(), 48.8428);
        assert_eq!(vehicle.thrust_bounds_n(), (-18.0, 18.0));
        assert_eq!(vehicle.inertia_kgm2()[1], 1.89075467);
    }

    #[test]
    fn test_invalid_vehicles_rejected() {
        let mut p = reference_params();
        p.mass_kg = 0.0;
        assert!(matches!(
            VehicleModel::new(p),
            Err(VehicleModelError::NonPositiveMass(_))
        ));

        let mut p = reference_params();
        p.iyy_kgm2 = -1.0;
        assert!(matches!(
            VehicleModel::new(p),
            Err(VehicleModelError::NonPositiveInertia("iyy_kgm2", _))
        ));

        let mut p = reference_params();
        p.min_thrust_n = 18.0;
        assert!(matches!(
            VehicleModel::new(p),
            Err(VehicleModelError::InvalidThrustBounds { .. })
        ));

        let mut p = reference_params();
        p.max_thrust_n = -20.0;
        assert!(VehicleModel::new(p).is_err());

        let mut p = reference_params();
        p.izz_kgm2 = std::f64::NAN;
        assert!(matches!(
            VehicleModel::new(p),
            Err(VehicleModelError::NonFinite("izz_kgm2"))
        ));
    }
}
