//! Centralized path resolution for ovc.
//!
//! The configuration file is looked up as follows:
//! 1. `--config` / `OVC_CONFIG`
//! 2. `OVC_CONFIG_DIR/config.json`
//! 3. `XDG_CONFIG_HOME/ovconverge/config.json`
//! 4. `~/.config/ovconverge/config.json`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file.
pub const ENV_CONFIG: &str = "OVC_CONFIG";

/// Environment variable naming the configuration directory.
pub const ENV_CONFIG_DIR: &str = "OVC_CONFIG_DIR";

const APP_DIR: &str = "ovconverge";
const CONFIG_FILE: &str = "config.json";

/// Get the ovc config directory path.
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!("Using config dir from {}: {}", ENV_CONFIG_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Resolve the configuration file, honouring an explicit path first.
pub fn config_file(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(expand(&path.to_string_lossy()));
    }
    if let Ok(file) = std::env::var(ENV_CONFIG) {
        let path = expand(&file);
        log::debug!("Using config file from {}: {}", ENV_CONFIG, path.display());
        return Ok(path);
    }
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Expand `~` and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
