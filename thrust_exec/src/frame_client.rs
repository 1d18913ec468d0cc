//! # Frame Client
//!
//! Requests frame transforms from the vehicle's frame server. Used once at startup to find the
//! position of every thruster.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::{Duration, Instant};

use comms_if::{
    eqpt::frames::{FrameReply, FrameRequest},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};
use log::{debug, warn};
use nalgebra::Vector3;

use crate::geometry::{PoseLookupError, PoseSource};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Time to wait before asking again for a frame the server doesn't know yet.
const RETRY_PERIOD: Duration = Duration::from_millis(100);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The frame client
pub struct FrameClient {
    /// Request-response socket for frame lookups
    reqrep: MonitoredSocket,

    /// True if waiting for a response on reqrep.
    awaiting_response: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send the request to the server: {0}")]
    SendError(zmq::Error),

    #[error("Could not recieve a message from the server: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the request: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the response from the server: {0}")]
    DeserializeError(serde_json::Error),

    #[error("The server responed with a message which was not valid UTF-8")]
    NonUtf8Response,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FrameClient {
    /// Create the client.
    ///
    /// This does not wait for the server, lookups wait for it up to their own timeout instead.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, FrameClientError> {
        let reqrep_opts = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            req_correlate: true,
            req_relaxed: true,
            ..Default::default()
        };

        let reqrep = MonitoredSocket::new(ctx, zmq::REQ, reqrep_opts, &params.frame_endpoint)
            .map_err(FrameClientError::SocketError)?;

        Ok(Self {
            reqrep,
            awaiting_response: false,
        })
    }

    /// Send a lookup request to the server.
    ///
    /// Returns `Ok(false)` if the request couldn't be sent yet, which happens while the server
    /// isn't connected.
    pub fn request(&mut self, request: &FrameRequest) -> Result<bool, FrameClientError> {
        let request_str =
            serde_json::to_string(request).map_err(FrameClientError::SerializationError)?;

        match self.reqrep.send(&request_str, 0) {
            Ok(_) => {
                self.awaiting_response = true;
                Ok(true)
            },
            Err(zmq::Error::EAGAIN) => Ok(false),
            Err(e) => Err(FrameClientError::SendError(e)),
        }
    }

    /// Get the reply to the last request, or `Ok(None)` if there isn't one yet.
    pub fn receive(&mut self) -> Result<Option<FrameReply>, FrameClientError> {
        if !self.awaiting_response {
            return Ok(None);
        }

        let response_str = match self.reqrep.recv_string(0) {
            // Valid response
            Ok(Ok(s)) => s,
            // Invalid response
            Ok(Err(_)) => return Err(FrameClientError::NonUtf8Response),
            // No response
            Err(zmq::Error::EAGAIN) => return Ok(None),
            // Recv error
            Err(e) => return Err(FrameClientError::RecvError(e)),
        };

        self.awaiting_response = false;

        serde_json::from_str(&response_str)
            .map(Some)
            .map_err(FrameClientError::DeserializeError)
    }
}

impl PoseSource for FrameClient {
    /// Poll the server until it knows the transform or the timeout expires.
    fn lookup(
        &mut self,
        parent: &str,
        child: &str,
        timeout: Duration
    ) -> Result<Vector3<f64>, PoseLookupError> {
        let deadline = Instant::now() + timeout;

        let request = FrameRequest {
            parent: parent.into(),
            child: child.into(),
        };

        // Relaxed REQ sockets allow a new request without the last reply, so any reply still in
        // flight from a previous lookup is dropped here
        self.awaiting_response = false;

        while Instant::now() < deadline {
            if !self.awaiting_response {
                let sent = self.request(&request)
                    .map_err(|e| PoseLookupError::Transport(Box::new(e)))?;

                if !sent {
                    std::thread::sleep(RETRY_PERIOD);
                    continue;
                }
            }

            let reply = self.receive()
                .map_err(|e| PoseLookupError::Transport(Box::new(e)))?;

            match reply {
                Some(FrameReply::Transform { translation_m, .. }) => {
                    debug!("Got transform of {} in {}: {:?}", child, parent, translation_m);
                    return Ok(Vector3::new(translation_m[0], translation_m[1], translation_m[2]))
                },
                Some(FrameReply::Unknown) => {
                    debug!("Frame server doesn't know {} in {} yet", child, parent);
                    std::thread::sleep(RETRY_PERIOD);
                },
                None => (),
            }
        }

        warn!("Timed out waiting for {} in {}", child, parent);

        Err(PoseLookupError::Timeout {
            parent: parent.into(),
            child: child.into(),
            timeout_s: timeout.as_secs_f64(),
        })
    }
}
