//! # Command Server Module
//!
//! This module abstracts over the networking side of the thrust allocation executable. Commands
//! are recieved on a conflated subscriber, so only the most recent one is ever waiting, and thrust
//! demands are published to any number of subscribers.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::{accel::AccelCmd, thrust::ThrustStamped},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions}
};
use log::warn;

use crate::cmd_ingest::ThrustSink;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An abstraction over the networking part of the thrust allocation executable.
pub struct CmdServer {

    /// SUB socket which recieves acceleration commands
    cmd_socket: MonitoredSocket,

    /// PUB socket which sends thrust demands
    thrust_socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur in the [`CmdServer`]
#[derive(thiserror::Error, Debug)]
pub enum CmdServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not serialize the thrust demand: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not send data to the subscribers: {0}")]
    SendError(zmq::Error)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CmdServer {

    /// Create a new instance of the command server.
    ///
    /// Both sockets are bound, this function will not wait for any connections before returning.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        cmd_recv_timeout_ms: i32
    ) -> Result<Self, CmdServerError> {

        // Create the socket options
        let cmd_socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            subscribe: Some(Vec::new()),
            conflate: true,
            recv_timeout: cmd_recv_timeout_ms,
            ..Default::default()
        };
        let thrust_socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            send_timeout: 10,
            ..Default::default()
        };

        // Create the sockets
        let cmd_socket = MonitoredSocket::new(
            ctx,
            zmq::SUB,
            cmd_socket_options,
            &params.accel_cmd_endpoint
        ).map_err(CmdServerError::SocketError)?;
        let thrust_socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            thrust_socket_options,
            &params.thrust_endpoint
        ).map_err(CmdServerError::SocketError)?;

        Ok(Self {
            cmd_socket,
            thrust_socket
        })
    }

    /// Retrieve the latest acceleration command.
    ///
    /// `None` is returned if no valid command arrives within the recieve timeout.
    pub fn get_command(&mut self) -> Option<AccelCmd> {

        // Read from the socket
        let msg = self.cmd_socket.recv_msg(0);

        match msg {
            Ok(m) => {
                match serde_json::from_str(m.as_str().unwrap_or("")) {
                    Ok(c) => Some(c),
                    Err(e) => {
                        warn!("Could not deserialize command: {}", e);
                        None
                    }
                }
            },
            Err(zmq::Error::EAGAIN) => None,
            Err(e) => {
                warn!("Could not read from the command socket: {}", e);
                None
            }
        }
    }
}

impl ThrustSink for CmdServer {
    type Error = CmdServerError;

    /// Publish a thrust demand.
    fn emit(&mut self, demand: &ThrustStamped) -> Result<(), CmdServerError> {
        let demand_str = serde_json::to_string(demand)
            .map_err(CmdServerError::SerializationError)?;

        self.thrust_socket.send(&demand_str, 0)
            .map_err(CmdServerError::SendError)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;
    use comms_if::eqpt::thrust::ThrustForces;
    use std::time::Duration;

    #[test]
    fn test_command_in_demand_out() {
        let ctx = zmq::Context::new();
        let params = NetParams {
            accel_cmd_endpoint: "inproc://cmd_server_cmd".into(),
            thrust_endpoint: "inproc://cmd_server_thrust".into(),
            frame_endpoint: "inproc://cmd_server_frames".into(),
        };

        let mut server = CmdServer::new(&ctx, &params, 100).unwrap();

        let cmd_pub = ctx.socket(zmq::PUB).unwrap();
        cmd_pub.connect(&params.accel_cmd_endpoint).unwrap();

        let thrust_sub = ctx.socket(zmq::SUB).unwrap();
        thrust_sub.set_subscribe(b"").unwrap();
        thrust_sub.set_rcvtimeo(1000).unwrap();
        thrust_sub.connect(&params.thrust_endpoint).unwrap();

        // Give the subscriptions time to propagate
        std::thread::sleep(Duration::from_millis(100));

        // Nothing sent yet
        assert!(server.get_command().is_none());

        let cmd = AccelCmd::new([0.5, 0.0, -0.1], [0.0, 0.2, 0.0]);
        cmd_pub.send(&serde_json::to_string(&cmd).unwrap(), 0).unwrap();

        let mut recieved = None;
        for _ in 0..10 {
            recieved = server.get_command();
            if recieved.is_some() {
                break;
            }
        }
        assert_eq!(recieved, Some(cmd));

        let mut force = ThrustForces::default();
        force.sway_aft = -3.25;
        let demand = ThrustStamped { timestamp: Utc::now(), force };
        server.emit(&demand).unwrap();

        let msg = thrust_sub.recv_string(0).unwrap().unwrap();
        let out: ThrustStamped = serde_json::from_str(&msg).unwrap();

        assert_eq!(out.force, demand.force);
        assert_eq!(out.timestamp.timestamp_millis(), demand.timestamp.timestamp_millis());
    }
}
