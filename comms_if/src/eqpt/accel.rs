//! # Acceleration Command Messages

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A plain three component vector as carried on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3Msg {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A body frame acceleration command.
///
/// No range is declared for any component and no validation is performed on receipt.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct AccelCmd {
    /// Linear acceleration (surge, sway, heave).
    ///
    /// Units: meters/second^2,
    /// Frame: Vehicle body
    pub linear: Vector3Msg,

    /// Angular acceleration (roll, pitch, yaw).
    ///
    /// Units: radians/second^2,
    /// Frame: Vehicle body
    pub angular: Vector3Msg,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl From<[f64; 3]> for Vector3Msg {
    fn from(v: [f64; 3]) -> Self {
        Self {
            x: v[0],
            y: v[1],
            z: v[2],
        }
    }
}

impl AccelCmd {
    /// Build a command from linear and angular component arrays.
    pub fn new(linear: [f64; 3], angular: [f64; 3]) -> Self {
        Self {
            linear: linear.into(),
            angular: angular.into(),
        }
    }

    /// Components in balance equation order: surge, sway, heave, roll, pitch, yaw.
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.linear.x,
            self.linear.y,
            self.linear.z,
            self.angular.x,
            self.angular.y,
            self.angular.z,
        ]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_accel_cmd_json() {
        let cmd: AccelCmd = serde_json::from_str(
            r#"{"linear":{"x":1.0,"y":0.0,"z":-0.5},"angular":{"x":0.0,"y":0.25,"z":0.0}}"#,
        )
        .unwrap();

        assert_eq!(cmd, AccelCmd::new([1.0, 0.0, -0.5], [0.0, 0.25, 0.0]));
        assert_eq!(cmd.as_array(), [1.0, 0.0, -0.5, 0.0, 0.25, 0.0]);
    }
}
