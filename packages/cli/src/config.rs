//! Config file loading.

use std::fs;
use std::path::{Path, PathBuf};

use kvfs_core::FsConfig;

use crate::CliError;

/// `<config dir>/kvfs/config.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("kvfs").join("config.json"))
}

/// Load the config.
///
/// An explicit path must exist. The default path is optional: when it is
/// missing the built-in defaults apply.
pub fn load(explicit: Option<&Path>) -> Result<FsConfig, CliError> {
    match explicit {
        Some(path) => read(path),
        None => match default_config_path() {
            Some(path) if path.exists() => read(&path),
            _ => Ok(FsConfig::default()),
        },
    }
}

fn read(path: &Path) -> Result<FsConfig, CliError> {
    log::debug!("Loading config from {}", path.display());
    let text = fs::read_to_string(path).map_err(|e| CliError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| CliError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
