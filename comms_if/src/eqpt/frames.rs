//! # Frame Lookup Messages
//!
//! Request/reply pair used to ask the vehicle's frame server where one frame sits relative to
//! another. Used once at startup to find every thruster relative to the centre of mass.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Request the transform of `child` expressed in `parent`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FrameRequest {
    pub parent: String,
    pub child: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Replies that can be sent by the frame server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum FrameReply {
    /// The transform is known.
    Transform {
        /// Origin of the child frame in the parent frame.
        ///
        /// Units: meters
        translation_m: [f64; 3],

        /// Rotation of the child frame in the parent frame as `[x, y, z, w]`.
        rotation_q: [f64; 4],
    },

    /// The server does not (yet) know one of the frames. The client may retry.
    Unknown,
}
