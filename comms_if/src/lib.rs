//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the thrust allocation software: the
//! messages exchanged with the rest of the vehicle and the network layer used to carry them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Message definitions for equipment (commands, thrust demands, frame lookups)
pub mod eqpt;

/// Network module
pub mod net;
