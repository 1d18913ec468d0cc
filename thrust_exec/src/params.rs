//! # Thrust Executable Parameters
//!
//! This module provides the parameters for the thrust allocation executable which aren't owned by
//! a single module.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use util::logger::LevelFilter;

use crate::{
    alloc::solver::{Backend, SolverOptions},
    vehicle::VehicleParams
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ThrustExecParams {

    /// Minimum level of messages written to the log
    pub log_level: LogLevel,

    /// If true a CSV record is archived for every allocation cycle
    pub archive_cycles: bool,

    /// Receive timeout of the command socket.
    ///
    /// Units: milliseconds
    pub cmd_recv_timeout_ms: i32,
}

/// Parameters of the allocation problem.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AllocParams {

    /// Which bounded least squares backend to use
    #[serde(default)]
    pub backend: Backend,

    pub vehicle: VehicleParams,

    #[serde(default)]
    pub solver: SolverOptions,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Log levels accepted by the logger.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Debug,
    Trace,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}
