//! Thrust allocation module

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cost;
mod problem;
pub mod solver;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use cost::*;
pub use problem::*;

use comms_if::eqpt::thrust::ThrusterId;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of balance equations, one per rigid body degree of freedom.
pub const NUM_EQUATIONS: usize = 6;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur while building the allocation problem.
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error(
        "The {equation:?} coefficient of thruster {id} is not finite, check the geometry and \
        vehicle model"
    )]
    NonFiniteCoefficient {
        equation: BalanceEquation,
        id: ThrusterId
    },
}
