//! Host environment utility functions

use std::path::PathBuf;

/// Name of the environment variable pointing at the root of the software
/// tree, i.e. the directory containing `params/` and `sessions/`.
pub const SW_ROOT_ENV_VAR: &str = "THRUST_SW_ROOT";

/// Get the root directory of the software tree from the environment.
pub fn get_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
