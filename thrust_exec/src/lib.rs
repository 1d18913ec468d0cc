//! # Thrust Allocation Library
//!
//! Maps a commanded body frame acceleration onto the ten thrusters of the vehicle. The allocation
//! is posed as a bound constrained least squares problem over the six rigid body balance
//! equations, built once at startup from the thruster geometry and the vehicle's mass properties.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Allocation problem, balance equations and the bounded least squares solvers.
pub mod alloc;

/// Command ingest module, the per-command processing cycle.
pub mod cmd_ingest;

/// Network server receiving commands and publishing thrust demands.
pub mod cmd_server;

/// Client for the vehicle's frame server.
pub mod frame_client;

/// Thruster mounting geometry.
pub mod geometry;

/// Parameters for the executable.
pub mod params;

/// Vehicle mass properties and thrust limits.
pub mod vehicle;
