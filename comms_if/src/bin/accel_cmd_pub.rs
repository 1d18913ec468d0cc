//! Publishes a constant acceleration command to the thrust allocation executable.
//!
//! Usage: `accel_cmd_pub SURGE SWAY HEAVE ROLL PITCH YAW [ENDPOINT]`

use comms_if::{
    eqpt::accel::AccelCmd,
    net::{MonitoredSocket, SocketOptions}
};

const DEFAULT_ENDPOINT: &str = "tcp://localhost:5020";

/// Number of times the command is sent.
const NUM_REPEATS: usize = 10;

fn main() -> Result<(), Box<dyn std::error::Error>> {

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.len() < 6 {
        println!("Usage: accel_cmd_pub SURGE SWAY HEAVE ROLL PITCH YAW [ENDPOINT]");
        return Ok(())
    }

    let mut components = [0f64; 6];
    for (c, a) in components.iter_mut().zip(args.iter()) {
        *c = a.parse()?;
    }

    let endpoint = args.get(6).map(|s| s.as_str()).unwrap_or(DEFAULT_ENDPOINT);

    let cmd = AccelCmd::new(
        [components[0], components[1], components[2]],
        [components[3], components[4], components[5]]
    );
    let cmd_str = serde_json::to_string(&cmd)?;

    // Create zmq context
    let ctx = zmq::Context::new();

    // The executable binds the subscriber, so connect to it here
    let socket_options = SocketOptions {
        connect_timeout: 1000,
        linger: 1,
        ..Default::default()
    };

    let socket = MonitoredSocket::new(
        &ctx,
        zmq::PUB,
        socket_options,
        endpoint
    )?;

    println!("Publishing {} to {}", cmd_str, endpoint);

    // Subscribers may miss the first few messages after connecting, so repeat the command for a
    // short while. The executable keeps only the latest one.
    for _ in 0..NUM_REPEATS {
        match socket.send(&cmd_str, 0) {
            Ok(_) => (),
            Err(e) => println!("Failed to send command: {}", e)
        }

        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    Ok(())
}
