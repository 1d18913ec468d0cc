//! # Thruster Geometry
//!
//! The geometry model holds the position of every thruster relative to the vehicle's centre of
//! mass. It is resolved once at startup from a [`PoseSource`] and shared read-only by the
//! allocation problem afterwards.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod static_source;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::BTreeMap, time::Duration};

use comms_if::eqpt::thrust::{ThrusterId, NUM_THRUSTERS};
use log::{debug, info};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

pub use static_source::StaticPoseSource;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of frame positions, such as a frame server or a fixed table.
pub trait PoseSource {
    /// Find the origin of `child` expressed in `parent`, waiting at most `timeout` for it to
    /// become available.
    ///
    /// Units: meters
    fn lookup(
        &mut self,
        parent: &str,
        child: &str,
        timeout: Duration
    ) -> Result<Vector3<f64>, PoseLookupError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters describing where the thruster geometry comes from.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GeometryParams {
    /// Which source to resolve the thruster positions from
    pub source: PoseSourceType,

    /// Frame the positions are expressed in, with its origin at the centre of mass
    pub base_frame: String,

    /// Suffix appended to a thruster's channel name to give its frame name
    pub frame_suffix: String,

    /// Maximum time to wait for each thruster frame.
    ///
    /// Units: seconds
    pub lookup_timeout_s: f64,

    /// Positions used by the static source, keyed by channel name.
    ///
    /// Units: meters,
    /// Frame: Vehicle body
    #[serde(default)]
    pub static_positions_m: BTreeMap<String, [f64; 3]>,
}

/// The position of a single thruster.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ThrusterPosition {
    pub id: ThrusterId,

    /// Units: meters,
    /// Frame: Vehicle body
    pub position_m_vb: Vector3<f64>,
}

/// Positions of all thrusters.
///
/// Positions are kept in the order they were supplied in, which is also the order of the
/// decision variables in the allocation problem. Every lookup is made by [`ThrusterId`], so the
/// order never changes which thruster a position belongs to.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GeometryModel {
    positions: Vec<ThrusterPosition>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseSourceType {
    /// Use `static_positions_m` from the parameters
    Static,

    /// Ask the vehicle's frame server
    FrameServer,
}

#[derive(Debug, thiserror::Error)]
pub enum PoseLookupError {
    #[error("Frame {child} is not known in {parent}")]
    NotFound {
        parent: String,
        child: String
    },

    #[error("Frame {child} did not become available in {parent} within {timeout_s} s")]
    Timeout {
        parent: String,
        child: String,
        timeout_s: f64
    },

    #[error("Could not communicate with the pose source: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("Position of thruster {id} is unavailable: {source}")]
    Unavailable {
        id: ThrusterId,
        source: PoseLookupError
    },

    #[error("Position of thruster {0} was given more than once")]
    Duplicate(ThrusterId),

    #[error("No position was given for thruster {0}")]
    Missing(ThrusterId),

    #[error("Position of thruster {0} is not finite")]
    NonFinite(ThrusterId),

    #[error("Static position given for {0}, which is not a thruster channel")]
    UnknownChannel(String),

    #[error("The frame lookup timeout of {0} s is invalid")]
    InvalidTimeout(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GeometryParams {
    /// Name of the frame attached to the given thruster.
    pub fn frame_name(&self, id: ThrusterId) -> String {
        format!("{}{}", id.name(), self.frame_suffix)
    }
}

impl GeometryModel {
    /// Build the model from a set of positions, in any order.
    ///
    /// Every thruster must appear exactly once.
    pub fn from_positions(positions: Vec<ThrusterPosition>) -> Result<Self, GeometryError> {
        let mut seen = [false; NUM_THRUSTERS];

        for p in positions.iter() {
            if seen[p.id.index()] {
                return Err(GeometryError::Duplicate(p.id))
            }
            seen[p.id.index()] = true;

            if !p.position_m_vb.iter().all(|c| c.is_finite()) {
                return Err(GeometryError::NonFinite(p.id))
            }
        }

        if let Some(id) = ThrusterId::ALL.iter().find(|id| !seen[id.index()]) {
            return Err(GeometryError::Missing(*id))
        }

        Ok(Self { positions })
    }

    /// Resolve the position of every thruster from the given source.
    ///
    /// Each thruster's frame is looked up by name under the base frame, blocking for at most the
    /// configured timeout. The first lookup to fail aborts the resolution.
    pub fn resolve(
        source: &mut dyn PoseSource,
        params: &GeometryParams
    ) -> Result<Self, GeometryError> {
        if !(params.lookup_timeout_s.is_finite() && params.lookup_timeout_s >= 0.0) {
            return Err(GeometryError::InvalidTimeout(params.lookup_timeout_s))
        }
        let timeout = Duration::from_secs_f64(params.lookup_timeout_s);

        let mut positions = Vec::with_capacity(NUM_THRUSTERS);

        for &id in ThrusterId::ALL.iter() {
            let frame = params.frame_name(id);

            debug!("Looking up {} in {}", frame, params.base_frame);

            let position_m_vb = source
                .lookup(&params.base_frame, &frame, timeout)
                .map_err(|e| GeometryError::Unavailable { id, source: e })?;

            info!(
                "Thruster {} at [{:.4}, {:.4}, {:.4}] m",
                id, position_m_vb[0], position_m_vb[1], position_m_vb[2]
            );

            positions.push(ThrusterPosition { id, position_m_vb });
        }

        Self::from_positions(positions)
    }

    /// All positions, in the order they were supplied in.
    pub fn positions(&self) -> &[ThrusterPosition] {
        &self.positions
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn position(geometry: &GeometryModel, id: ThrusterId) -> Vector3<f64> {
        geometry.positions().iter().find(|p| p.id == id).unwrap().position_m_vb
    }

    fn geometry_params() -> GeometryParams {
        util::params::parse(include_str!("../../../params/thruster_geometry.toml")).unwrap()
    }

    #[test]
    fn test_shipped_params_resolve() {
        let params = geometry_params();
        let mut source = StaticPoseSource::from_params(&params).unwrap();
        let geometry = GeometryModel::resolve(&mut source, &params).unwrap();

        assert_eq!(geometry.positions().len(), NUM_THRUSTERS);
        assert_eq!(params.lookup_timeout_s, 10.0);
        assert_eq!(params.frame_name(ThrusterId::SwayAft), "sway_aft_thruster");
        assert_eq!(
            position(&geometry, ThrusterId::SurgePortHi),
            Vector3::new(-0.25, 0.2, 0.08)
        );
        assert_eq!(
            position(&geometry, ThrusterId::HeaveStbdFwd),
            Vector3::new(0.2, -0.22, 0.0)
        );
    }

    #[test]
    fn test_missing_frame_is_fatal() {
        let mut params = geometry_params();
        params.static_positions_m.remove("heave_port_fwd");
        let mut source = StaticPoseSource::from_params(&params).unwrap();

        match GeometryModel::resolve(&mut source, &params) {
            Err(GeometryError::Unavailable { id, source: PoseLookupError::NotFound { .. } }) => {
                assert_eq!(id, ThrusterId::HeavePortFwd)
            },
            r => panic!("Expected unavailable heave_port_fwd, got {:?}", r)
        }
    }

    #[test]
    fn test_from_positions_any_order() {
        let positions: Vec<ThrusterPosition> = ThrusterId::ALL
            .iter()
            .rev()
            .enumerate()
            .map(|(i, &id)| ThrusterPosition {
                id,
                position_m_vb: Vector3::new(i as f64, 0.0, 0.0)
            })
            .collect();

        let geometry = GeometryModel::from_positions(positions).unwrap();

        assert_eq!(geometry.positions()[0].id, ThrusterId::HeavePortFwd);
        assert_eq!(position(&geometry, ThrusterId::HeavePortFwd)[0], 0.0);
        assert_eq!(position(&geometry, ThrusterId::SurgeStbdHi)[0], 9.0);
    }

    #[test]
    fn test_from_positions_rejects_bad_sets() {
        let mut positions: Vec<ThrusterPosition> = ThrusterId::ALL
            .iter()
            .map(|&id| ThrusterPosition { id, position_m_vb: Vector3::zeros() })
            .collect();

        let mut dup = positions.clone();
        dup[3].id = ThrusterId::SurgeStbdHi;
        assert!(matches!(
            GeometryModel::from_positions(dup),
            Err(GeometryError::Duplicate(ThrusterId::SurgeStbdHi))
        ));

        positions.pop();
        assert!(matches!(
            GeometryModel::from_positions(positions.clone()),
            Err(GeometryError::Missing(ThrusterId::HeavePortFwd))
        ));

        positions.push(ThrusterPosition {
            id: ThrusterId::HeavePortFwd,
            position_m_vb: Vector3::new(0.0, std::f64::INFINITY, 0.0)
        });
        assert!(matches!(
            GeometryModel::from_positions(positions),
            Err(GeometryError::NonFinite(ThrusterId::HeavePortFwd))
        ));
    }
}
