//! # Command Ingest
//!
//! Processes one acceleration command per cycle: solves the allocation problem, stamps the result
//! and hands it to the output boundary. Commands aren't validated and one is processed to
//! completion before the next is accepted.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use comms_if::eqpt::{
    accel::AccelCmd,
    thrust::{ThrustForces, ThrustStamped, ThrusterId}
};
use log::{trace, warn};
use serde::Serialize;

// Internal
use crate::alloc::{
    solver::{SolverSummary, TerminationType},
    AllocationProblem
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    maths::at_bound,
    module::State,
    session::{self, Session}
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Distance from a thrust bound within which a thruster is reported as saturated.
///
/// Units: Newtons
pub const SATURATION_TOLERANCE_N: f64 = 1e-9;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// The output boundary, where stamped thrust demands are sent once computed.
pub trait ThrustSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn emit(&mut self, demand: &ThrustStamped) -> Result<(), Self::Error>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command ingest module state
#[derive(Default)]
pub struct CommandIngest {
    problem: Option<AllocationProblem>,

    last_cycle: Option<CycleRecord>,
    arch_cycle: Archiver,
}

/// Data needed to initialise command ingest.
pub struct InitData {
    /// The problem to solve for every command
    pub problem: AllocationProblem,

    /// If true every cycle is archived to the session
    pub archive_cycles: bool,
}

/// Status report for a single allocation cycle.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct StatusReport {
    pub termination: TerminationType,

    pub iterations: usize,

    pub final_cost: f64,

    /// Thrusters sitting on either thrust bound
    pub saturated: Vec<ThrusterId>,
}

/// A single archived cycle.
///
/// Kept flat so that it can be written as one CSV row.
#[derive(Clone, Copy, Serialize, Debug)]
struct CycleRecord {
    time_s: f64,

    cmd_linear_x: f64,
    cmd_linear_y: f64,
    cmd_linear_z: f64,
    cmd_angular_x: f64,
    cmd_angular_y: f64,
    cmd_angular_z: f64,

    surge_stbd_hi: f64,
    surge_port_hi: f64,
    surge_port_lo: f64,
    surge_stbd_lo: f64,
    sway_fwd: f64,
    sway_aft: f64,
    heave_port_aft: f64,
    heave_stbd_aft: f64,
    heave_stbd_fwd: f64,
    heave_port_fwd: f64,

    termination: TerminationType,
    iterations: usize,
    final_cost: f64,
    num_saturated: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Command ingest has not been initialised")]
    NotInitialised,

    #[error("Could not open the cycle archive: {0}")]
    ArchiveInitError(ArchiveError),

    #[error("Could not emit the thrust demand: {0}")]
    EmitError(Box<dyn std::error::Error + Send + Sync>),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CommandIngest {
    /// Create a ready to use instance which doesn't archive its cycles.
    pub fn new(problem: AllocationProblem) -> Self {
        Self {
            problem: Some(problem),
            ..Default::default()
        }
    }

    /// Process a command to completion and send the result to the sink.
    ///
    /// The result is emitted whether or not the solver converged. Archive failures are logged and
    /// otherwise ignored.
    pub fn on_command<S: ThrustSink>(
        &mut self,
        cmd: &AccelCmd,
        sink: &mut S
    ) -> Result<StatusReport, IngestError> {
        let (demand, report) = self.proc(cmd)?;

        sink.emit(&demand).map_err(|e| IngestError::EmitError(Box::new(e)))?;

        if let Err(e) = self.write() {
            warn!("Could not archive the allocation cycle: {}", e);
        }

        Ok(report)
    }
}

impl State for CommandIngest {
    type InitData = InitData;
    type InitError = IngestError;

    type InputData = AccelCmd;
    type OutputData = ThrustStamped;
    type StatusReport = StatusReport;
    type ProcError = IngestError;

    /// Initialise command ingest with the allocation problem built at startup.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        self.problem = Some(init_data.problem);
        self.last_cycle = None;

        if init_data.archive_cycles {
            self.arch_cycle = Archiver::from_path(session, "cmd_ingest/cycles.csv")
                .map_err(IngestError::ArchiveInitError)?;
        }

        Ok(())
    }

    /// Allocate a single command.
    fn proc(&mut self, cmd: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let problem = self.problem.as_ref().ok_or(IngestError::NotInitialised)?;

        let (force, summary) = problem.solve(cmd);
        let timestamp = Utc::now();

        let (min, max) = problem.thrust_bounds_n();
        let saturated: Vec<ThrusterId> = force
            .iter()
            .filter(|(_, f)| at_bound(f, &min, &max, &SATURATION_TOLERANCE_N))
            .map(|(id, _)| id)
            .collect();

        if !summary.converged() {
            warn!(
                "Allocation did not converge, publishing best effort forces: {} after {} \
                iterations ({})",
                summary.termination, summary.iterations, summary.message
            );
        }

        trace!("Saturated thrusters: {:?}", saturated);

        self.last_cycle = Some(CycleRecord::new(cmd, &force, &summary, saturated.len()));

        let report = StatusReport {
            termination: summary.termination,
            iterations: summary.iterations,
            final_cost: summary.final_cost,
            saturated,
        };

        Ok((ThrustStamped { timestamp, force }, report))
    }
}

impl Archived for CommandIngest {
    fn write(&mut self) -> Result<(), ArchiveError> {
        if !self.arch_cycle.is_open() {
            return Ok(())
        }

        if let Some(record) = self.last_cycle.take() {
            self.arch_cycle.serialise(record)?;
        }

        Ok(())
    }
}

impl CycleRecord {
    fn new(
        cmd: &AccelCmd,
        force: &ThrustForces,
        summary: &SolverSummary,
        num_saturated: usize
    ) -> Self {
        Self {
            time_s: session::get_elapsed_seconds(),
            cmd_linear_x: cmd.linear.x,
            cmd_linear_y: cmd.linear.y,
            cmd_linear_z: cmd.linear.z,
            cmd_angular_x: cmd.angular.x,
            cmd_angular_y: cmd.angular.y,
            cmd_angular_z: cmd.angular.z,
            surge_stbd_hi: force.surge_stbd_hi,
            surge_port_hi: force.surge_port_hi,
            surge_port_lo: force.surge_port_lo,
            surge_stbd_lo: force.surge_stbd_lo,
            sway_fwd: force.sway_fwd,
            sway_aft: force.sway_aft,
            heave_port_aft: force.heave_port_aft,
            heave_stbd_aft: force.heave_stbd_aft,
            heave_stbd_fwd: force.heave_stbd_fwd,
            heave_port_fwd: force.heave_port_fwd,
            termination: summary.termination,
            iterations: summary.iterations,
            final_cost: summary.final_cost,
            num_saturated,
        }
    }
}
