//! Prints every thrust demand published by the thrust allocation executable.
//!
//! Usage: `thrust_sub [ENDPOINT]`

use comms_if::{
    eqpt::thrust::ThrustStamped,
    net::{MonitoredSocket, SocketOptions}
};

const DEFAULT_ENDPOINT: &str = "tcp://localhost:5021";

fn main() -> Result<(), Box<dyn std::error::Error>> {

    let endpoint = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_ENDPOINT.into());

    // Create context
    let ctx = zmq::Context::new();

    // Don't wait for the executable, it may be started after this
    let socket_options = SocketOptions {
        block_on_first_connect: false,
        subscribe: Some(Vec::new()),
        ..Default::default()
    };

    let socket = MonitoredSocket::new(
        &ctx,
        zmq::SUB,
        socket_options,
        &endpoint
    )?;

    // Recieve demands from the executable
    loop {
        let msg = socket.recv_string(0)?;

        let msg = match msg {
            Ok(s) => s,
            Err(_) => {
                println!("Got non UTF-8 message");
                continue;
            }
        };

        match serde_json::from_str::<ThrustStamped>(&msg) {
            Ok(demand) => {
                println!("{}:", demand.timestamp);
                for (id, force) in demand.force.iter() {
                    println!("    {:>16}: {:+8.3} N", id, force);
                }
            },
            Err(e) => println!("Could not parse demand: {}", e)
        }
    }
}
