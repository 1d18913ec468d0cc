//! Pose source backed by a fixed table of positions

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::HashMap, time::Duration};

use comms_if::eqpt::thrust::ThrusterId;
use nalgebra::Vector3;

use super::{GeometryError, GeometryParams, PoseLookupError, PoseSource};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Serves frame positions from a table built at startup. Lookups never wait.
#[derive(Debug, Clone, Default)]
pub struct StaticPoseSource {
    /// Positions keyed by `(parent, child)` frame names
    frames: HashMap<(String, String), Vector3<f64>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StaticPoseSource {
    /// Build the table from the static positions in the geometry parameters.
    ///
    /// Every key must be a thruster channel name, so that a misspelt channel is reported as such
    /// rather than as a missing frame.
    pub fn from_params(params: &GeometryParams) -> Result<Self, GeometryError> {
        let mut source = Self::default();

        for (channel, p) in params.static_positions_m.iter() {
            let id = ThrusterId::from_name(channel)
                .ok_or_else(|| GeometryError::UnknownChannel(channel.clone()))?;

            source.insert(
                &params.base_frame,
                &params.frame_name(id),
                Vector3::new(p[0], p[1], p[2])
            );
        }

        Ok(source)
    }

    /// Add or replace the position of `child` in `parent`.
    pub fn insert(&mut self, parent: &str, child: &str, position_m: Vector3<f64>) {
        self.frames.insert((parent.into(), child.into()), position_m);
    }
}

impl PoseSource for StaticPoseSource {
    fn lookup(
        &mut self,
        parent: &str,
        child: &str,
        _timeout: Duration
    ) -> Result<Vector3<f64>, PoseLookupError> {
        self.frames
            .get(&(parent.to_string(), child.to_string()))
            .copied()
            .ok_or_else(|| PoseLookupError::NotFound {
                parent: parent.into(),
                child: child.into()
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lookup() {
        let mut source = StaticPoseSource::default();
        source.insert("base_link", "sway_fwd_thruster", Vector3::new(0.3, 0.0, 0.05));

        let timeout = Duration::from_secs(10);

        assert_eq!(
            source.lookup("base_link", "sway_fwd_thruster", timeout).unwrap(),
            Vector3::new(0.3, 0.0, 0.05)
        );
        assert!(matches!(
            source.lookup("odom", "sway_fwd_thruster", timeout),
            Err(PoseLookupError::NotFound { .. })
        ));
        assert!(source.lookup("base_link", "sway_aft_thruster", timeout).is_err());
    }

    #[test]
    fn test_from_params_rejects_unknown_channel() {
        let mut params: GeometryParams = util::params::parse(
            include_str!("../../../params/thruster_geometry.toml")
        ).unwrap();

        let source = StaticPoseSource::from_params(&params).unwrap();
        assert_eq!(source.frames.len(), 10);
        assert!(source.frames.contains_key(
            &("base_link".to_string(), "heave_stbd_aft_thruster".to_string())
        ));

        let p = params.static_positions_m.remove("heave_stbd_aft").unwrap();
        params.static_positions_m.insert("heave_starboard_aft".into(), p);

        match StaticPoseSource::from_params(&params) {
            Err(GeometryError::UnknownChannel(name)) => assert_eq!(name, "heave_starboard_aft"),
            r => panic!("Expected unknown channel heave_starboard_aft, got {:?}", r)
        }
    }
}
