//! Balance equations and the cost function interface used by the solvers

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::{
    accel::AccelCmd,
    thrust::{ThrustAxis, ThrustForces, ThrusterId}
};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

// Internal
use super::{AllocError, NUM_EQUATIONS};
use crate::{geometry::GeometryModel, vehicle::VehicleModel};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A least squares objective, `0.5 * |r(x)|^2`, over a vector of parameters.
pub trait CostFunction {
    fn num_residuals(&self) -> usize;

    fn num_parameters(&self) -> usize;

    /// Evaluate the residual vector at `x`.
    fn residuals(&self, x: &DVector<f64>) -> DVector<f64>;

    /// Evaluate the jacobian of the residuals at `x`, one row per residual.
    fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64>;

    fn cost(&self, x: &DVector<f64>) -> f64 {
        0.5 * self.residuals(x).norm_squared()
    }
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The six rigid body balance equations.
///
/// Each row maps the thruster forces onto one component of body acceleration, so for a force
/// vector `f` and a command `b` the residual is `A f - b`.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceEquations {
    /// Thruster owning each column of `coefficients`
    ids: Vec<ThrusterId>,

    /// `NUM_EQUATIONS` x thrusters coefficient matrix
    coefficients: DMatrix<f64>,
}

/// Balance equations bound to a single command.
pub struct BalanceResiduals<'a> {
    equations: &'a BalanceEquations,
    target: DVector<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The balance equations, in the order of their rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BalanceEquation {
    Surge,
    Sway,
    Heave,
    Roll,
    Pitch,
    Yaw,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BalanceEquation {
    pub const ALL: [BalanceEquation; NUM_EQUATIONS] = [
        BalanceEquation::Surge,
        BalanceEquation::Sway,
        BalanceEquation::Heave,
        BalanceEquation::Roll,
        BalanceEquation::Pitch,
        BalanceEquation::Yaw,
    ];

    /// Row of this equation, which is also the index of its target in [`AccelCmd::as_array`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl BalanceEquations {
    /// Build the coefficients from the geometry and vehicle models.
    ///
    /// Columns follow the order of the geometry's positions.
    ///
    /// | Thruster axis | Linear      | Angular                         |
    /// |---------------|-------------|---------------------------------|
    /// | Surge         | surge `1/m` | pitch `z/Iyy`, yaw `y/Izz`      |
    /// | Sway          | sway `1/m`  | roll `z/Ixx`, yaw `x/Izz`       |
    /// | Heave         | heave `1/m` | roll `y/Ixx`, pitch `x/Iyy`     |
    pub fn new(
        geometry: &GeometryModel,
        vehicle: &VehicleModel
    ) -> Result<Self, AllocError> {
        let positions = geometry.positions();

        let inv_mass = 1.0 / vehicle.mass_kg();
        let [ixx, iyy, izz] = vehicle.inertia_kgm2();

        let mut coefficients = DMatrix::zeros(NUM_EQUATIONS, positions.len());
        let mut ids = Vec::with_capacity(positions.len());

        for (col, tp) in positions.iter().enumerate() {
            let p = &tp.position_m_vb;

            // Arms are the raw position components, the direction of each thruster is carried
            // by the sign of its force
            let terms = match tp.id.axis() {
                ThrustAxis::Surge => [
                    (BalanceEquation::Surge, inv_mass),
                    (BalanceEquation::Pitch, p.z / iyy),
                    (BalanceEquation::Yaw, p.y / izz),
                ],
                ThrustAxis::Sway => [
                    (BalanceEquation::Sway, inv_mass),
                    (BalanceEquation::Roll, p.z / ixx),
                    (BalanceEquation::Yaw, p.x / izz),
                ],
                ThrustAxis::Heave => [
                    (BalanceEquation::Heave, inv_mass),
                    (BalanceEquation::Roll, p.y / ixx),
                    (BalanceEquation::Pitch, p.x / iyy),
                ],
            };

            for &(equation, value) in terms.iter() {
                if !value.is_finite() {
                    return Err(AllocError::NonFiniteCoefficient { equation, id: tp.id })
                }
                coefficients[(equation.index(), col)] = value;
            }

            ids.push(tp.id);
        }

        Ok(Self { ids, coefficients })
    }

    /// Thrusters in column order.
    pub fn ids(&self) -> &[ThrusterId] {
        &self.ids
    }

    pub fn coefficients(&self) -> &DMatrix<f64> {
        &self.coefficients
    }

    /// Coefficient of a thruster's force in an equation.
    pub fn coefficient(&self, equation: BalanceEquation, id: ThrusterId) -> f64 {
        match self.ids.iter().position(|&i| i == id) {
            Some(col) => self.coefficients[(equation.index(), col)],
            None => 0.0
        }
    }

    /// Bind the equations to a command, giving the cost function to minimise.
    pub fn for_command(&self, cmd: &AccelCmd) -> BalanceResiduals<'_> {
        BalanceResiduals {
            equations: self,
            target: DVector::from_row_slice(&cmd.as_array())
        }
    }

    /// Gather the forces into a vector in column order.
    pub fn to_vector(&self, forces: &ThrustForces) -> DVector<f64> {
        DVector::from_iterator(self.ids.len(), self.ids.iter().map(|&id| forces.get(id)))
    }

    /// Scatter a column ordered vector back onto the named thrusters.
    pub fn to_forces(&self, x: &DVector<f64>) -> ThrustForces {
        let mut forces = ThrustForces::default();

        for (&id, &f) in self.ids.iter().zip(x.iter()) {
            forces.set(id, f);
        }

        forces
    }

    /// Residual of every equation for the given forces and command, in equation order.
    pub fn residuals(&self, forces: &ThrustForces, cmd: &AccelCmd) -> [f64; NUM_EQUATIONS] {
        let r = self.for_command(cmd).residuals(&self.to_vector(forces));

        let mut out = [0f64; NUM_EQUATIONS];
        out.copy_from_slice(r.as_slice());
        out
    }
}

impl<'a> CostFunction for BalanceResiduals<'a> {
    fn num_residuals(&self) -> usize {
        NUM_EQUATIONS
    }

    fn num_parameters(&self) -> usize {
        self.equations.ids.len()
    }

    fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
        &self.equations.coefficients * x - &self.target
    }

    fn jacobian(&self, _x: &DVector<f64>) -> DMatrix<f64> {
        self.equations.coefficients.clone()
    }
}
