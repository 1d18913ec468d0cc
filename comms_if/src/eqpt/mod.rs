//! # Equipment Interface
//!
//! This module defines the interface structures which are sent between the thrust allocation
//! executable and the rest of the vehicle.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod accel;
pub mod frames;
pub mod thrust;
