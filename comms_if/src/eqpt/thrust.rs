//! # Thrust Demand Messages
//!
//! Defines the ten thruster channels of the vehicle and the per-thruster force demand published
//! after every allocation cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The number of thrusters on the vehicle.
pub const NUM_THRUSTERS: usize = 10;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// IDs of all thruster channels on the vehicle.
///
/// `stbd`/`port` give the side, `fwd`/`aft` the end and `hi`/`lo` the height of the mounting.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone)]
#[serde(rename_all = "snake_case")]
pub enum ThrusterId {
    SurgeStbdHi,
    SurgePortHi,
    SurgePortLo,
    SurgeStbdLo,
    SwayFwd,
    SwayAft,
    HeavePortAft,
    HeaveStbdAft,
    HeaveStbdFwd,
    HeavePortFwd,
}

/// The body axis along which a thruster pushes.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Copy, Clone)]
pub enum ThrustAxis {
    /// Body X
    Surge,
    /// Body Y
    Sway,
    /// Body Z
    Heave,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Force demand for every thruster.
///
/// Units: Newtons
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct ThrustForces {
    pub surge_stbd_hi: f64,
    pub surge_port_hi: f64,
    pub surge_port_lo: f64,
    pub surge_stbd_lo: f64,
    pub sway_fwd: f64,
    pub sway_aft: f64,
    pub heave_port_aft: f64,
    pub heave_stbd_aft: f64,
    pub heave_stbd_fwd: f64,
    pub heave_port_fwd: f64,
}

/// A timestamped force demand, the output of one allocation cycle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ThrustStamped {
    /// UTC time at which the forces were computed
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// The demanded forces
    pub force: ThrustForces,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ThrusterId {
    /// All thrusters, in the order their fields appear in [`ThrustForces`].
    pub const ALL: [ThrusterId; NUM_THRUSTERS] = [
        ThrusterId::SurgeStbdHi,
        ThrusterId::SurgePortHi,
        ThrusterId::SurgePortLo,
        ThrusterId::SurgeStbdLo,
        ThrusterId::SwayFwd,
        ThrusterId::SwayAft,
        ThrusterId::HeavePortAft,
        ThrusterId::HeaveStbdAft,
        ThrusterId::HeaveStbdFwd,
        ThrusterId::HeavePortFwd,
    ];

    /// Position of this thruster in [`ThrusterId::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The channel name of this thruster, as used in frame names and on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ThrusterId::SurgeStbdHi => "surge_stbd_hi",
            ThrusterId::SurgePortHi => "surge_port_hi",
            ThrusterId::SurgePortLo => "surge_port_lo",
            ThrusterId::SurgeStbdLo => "surge_stbd_lo",
            ThrusterId::SwayFwd => "sway_fwd",
            ThrusterId::SwayAft => "sway_aft",
            ThrusterId::HeavePortAft => "heave_port_aft",
            ThrusterId::HeaveStbdAft => "heave_stbd_aft",
            ThrusterId::HeaveStbdFwd => "heave_stbd_fwd",
            ThrusterId::HeavePortFwd => "heave_port_fwd",
        }
    }

    /// Find the thruster with the given channel name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.name() == name)
    }

    /// The axis this thruster pushes along.
    pub fn axis(&self) -> ThrustAxis {
        match self {
            ThrusterId::SurgeStbdHi
            | ThrusterId::SurgePortHi
            | ThrusterId::SurgePortLo
            | ThrusterId::SurgeStbdLo => ThrustAxis::Surge,
            ThrusterId::SwayFwd | ThrusterId::SwayAft => ThrustAxis::Sway,
            ThrusterId::HeavePortAft
            | ThrusterId::HeaveStbdAft
            | ThrusterId::HeaveStbdFwd
            | ThrusterId::HeavePortFwd => ThrustAxis::Heave,
        }
    }
}

impl fmt::Display for ThrusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl ThrustForces {
    /// Get the force demanded of a thruster.
    pub fn get(&self, id: ThrusterId) -> f64 {
        match id {
            ThrusterId::SurgeStbdHi => self.surge_stbd_hi,
            ThrusterId::SurgePortHi => self.surge_port_hi,
            ThrusterId::SurgePortLo => self.surge_port_lo,
            ThrusterId::SurgeStbdLo => self.surge_stbd_lo,
            ThrusterId::SwayFwd => self.sway_fwd,
            ThrusterId::SwayAft => self.sway_aft,
            ThrusterId::HeavePortAft => self.heave_port_aft,
            ThrusterId::HeaveStbdAft => self.heave_stbd_aft,
            ThrusterId::HeaveStbdFwd => self.heave_stbd_fwd,
            ThrusterId::HeavePortFwd => self.heave_port_fwd,
        }
    }

    /// Set the force demanded of a thruster.
    pub fn set(&mut self, id: ThrusterId, force_n: f64) {
        let field = match id {
            ThrusterId::SurgeStbdHi => &mut self.surge_stbd_hi,
            ThrusterId::SurgePortHi => &mut self.surge_port_hi,
            ThrusterId::SurgePortLo => &mut self.surge_port_lo,
            ThrusterId::SurgeStbdLo => &mut self.surge_stbd_lo,
            ThrusterId::SwayFwd => &mut self.sway_fwd,
            ThrusterId::SwayAft => &mut self.sway_aft,
            ThrusterId::HeavePortAft => &mut self.heave_port_aft,
            ThrusterId::HeaveStbdAft => &mut self.heave_stbd_aft,
            ThrusterId::HeaveStbdFwd => &mut self.heave_stbd_fwd,
            ThrusterId::HeavePortFwd => &mut self.heave_port_fwd,
        };

        *field = force_n;
    }

    /// Iterate over every thruster and its force, in field order.
    pub fn iter(&self) -> impl Iterator<Item = (ThrusterId, f64)> + '_ {
        ThrusterId::ALL.iter().map(move |&id| (id, self.get(id)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_names_round_trip_through_serde() {
        for id in ThrusterId::ALL.iter() {
            assert_eq!(ThrusterId::from_name(id.name()), Some(*id));
            assert_eq!(
                serde_json::to_string(id).unwrap(),
                format!("\"{}\"", id.name())
            );
        }

        assert_eq!(ThrusterId::from_name("surge_fwd"), None);
    }

    #[test]
    fn test_index_matches_all() {
        for (i, id) in ThrusterId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn test_axes() {
        let count = |axis| ThrusterId::ALL.iter().filter(|id| id.axis() == axis).count();

        assert_eq!(count(ThrustAxis::Surge), 4);
        assert_eq!(count(ThrustAxis::Sway), 2);
        assert_eq!(count(ThrustAxis::Heave), 4);
    }

    #[test]
    fn test_get_set() {
        let mut forces = ThrustForces::default();
        forces.set(ThrusterId::HeaveStbdFwd, -4.5);

        assert_eq!(forces.heave_stbd_fwd, -4.5);
        assert_eq!(forces.get(ThrusterId::HeaveStbdFwd), -4.5);
        assert_eq!(forces.iter().filter(|(_, f)| *f != 0.0).count(), 1);
    }
}
