//! # Thrust Allocation Executable
//!
//! This executable maps commanded body frame accelerations onto the ten thrusters of the vehicle:
//! - Resolves the thruster geometry once at startup
//! - Builds the allocation problem from the geometry and vehicle model
//! - Solves it for every recieved command and publishes the resulting thrust demands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{Result, eyre::WrapErr};
use comms_if::net::{zmq, NetParams};
use log::{info, trace, warn};

// Internal
use thrust_lib::{
    alloc::AllocationProblem,
    cmd_ingest::{self, CommandIngest},
    cmd_server::CmdServer,
    frame_client::FrameClient,
    geometry::{GeometryModel, GeometryParams, PoseSource, PoseSourceType, StaticPoseSource},
    params::{AllocParams, ThrustExecParams},
    vehicle::VehicleModel,
};
use util::{
    host,
    logger::logger_init,
    module::State,
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {

    // ---- EARLY INITIALISATION ----

    color_eyre::install()?;

    // Initialise session
    let session = Session::new(
        "thrust_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // The log level is a parameter, so these must be loaded before the logger
    let exec_params: ThrustExecParams = util::params::load("thrust_exec.toml")
        .wrap_err("Failed to load the executable parameters")?;

    // Initialise logger
    logger_init(exec_params.log_level.into(), &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Thrust Allocation Executable\n");
    info!(
        "Software root: {:?}",
        host::get_sw_root().wrap_err("Failed to get the software root")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams = util::params::load("net.toml")
        .wrap_err("Failed to load the network parameters")?;
    let alloc_params: AllocParams = util::params::load("thrust_alloc.toml")
        .wrap_err("Failed to load the allocation parameters")?;
    let geom_params: GeometryParams = util::params::load("thruster_geometry.toml")
        .wrap_err("Failed to load the thruster geometry parameters")?;

    info!("Parameters loaded");

    let ctx = zmq::Context::new();

    // ---- GEOMETRY ----

    let mut pose_source: Box<dyn PoseSource> = match geom_params.source {
        PoseSourceType::Static => {
            info!("Using static thruster positions");
            Box::new(
                StaticPoseSource::from_params(&geom_params)
                    .wrap_err("Invalid static thruster positions")?
            )
        },
        PoseSourceType::FrameServer => {
            info!("Looking up thruster positions from {}", net_params.frame_endpoint);
            Box::new(
                FrameClient::new(&ctx, &net_params)
                    .wrap_err("Failed to initialise the frame client")?
            )
        }
    };

    let geometry = GeometryModel::resolve(pose_source.as_mut(), &geom_params)
        .wrap_err("Failed to resolve the thruster geometry")?;

    // Close the frame client, it isn't needed again
    drop(pose_source);

    info!("Thruster geometry resolved");

    // ---- VEHICLE AND PROBLEM ----

    let vehicle = VehicleModel::new(alloc_params.vehicle)
        .wrap_err("Invalid vehicle model")?;

    info!("Vehicle model: {:#?}", vehicle.params());

    session.save("geometry.json", geometry.clone());
    session.save("vehicle.json", vehicle);

    let problem = AllocationProblem::new(
        &geometry,
        &vehicle,
        alloc_params.backend,
        alloc_params.solver
    ).wrap_err("Failed to build the allocation problem")?;

    info!("Allocation problem built using the {:?} solver", problem.backend());

    let mut ingest = CommandIngest::default();
    ingest.init(
        cmd_ingest::InitData {
            problem,
            archive_cycles: exec_params.archive_cycles
        },
        &session
    ).wrap_err("Failed to initialise command ingest")?;

    // ---- SERVER INITIALISATION ----

    let mut server = CmdServer::new(&ctx, &net_params, exec_params.cmd_recv_timeout_ms)
        .wrap_err("Failed to initialise the command server")?;

    info!("Server initialised");

    // ---- MAIN LOOP ----

    info!("Initialisation complete, entering main loop");

    loop {
        // Get the latest command
        let cmd = match server.get_command() {
            Some(c) => c,
            None => continue
        };

        trace!("Recieved command {:?}", cmd);

        match ingest.on_command(&cmd, &mut server) {
            Ok(report) => trace!("Cycle complete: {:?}", report),
            Err(e) => warn!("Allocation cycle failed: {}", e)
        }
    }
}
