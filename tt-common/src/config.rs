//! Configuration file loading and root folder resolution
//!
//! Services describe their own typed config structs; this module only knows
//! how to find the config file, parse TOML into those structs, and resolve
//! the data root folder.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Locate the service configuration file.
///
/// Priority order:
/// 1. `TRAINTRACK_CONFIG` environment variable (explicit path)
/// 2. `~/.config/traintrack/config.toml`
/// 3. `/etc/traintrack/config.toml` (Linux only)
///
/// Returns `None` when no candidate exists; callers run on defaults then.
pub fn locate_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("TRAINTRACK_CONFIG") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        // An explicit path that does not exist is a misconfiguration worth
        // surfacing, but resolution itself stays best-effort.
        tracing::warn!("TRAINTRACK_CONFIG points at missing file: {}", path.display());
        return None;
    }

    if let Some(user_config) = dirs::config_dir().map(|d| d.join("traintrack").join("config.toml"))
    {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/traintrack/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Read a TOML document into a typed config struct
pub fn read_toml_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Resolve the data root folder (database, extracted content packages).
///
/// Priority order:
/// 1. Environment variable (`env_var_name`)
/// 2. `root_folder` from the config file
/// 3. OS-dependent default
pub fn resolve_root_folder(env_var_name: &str, config_root: Option<&str>) -> PathBuf {
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = config_root {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    default_root_folder()
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/traintrack (or /var/lib/traintrack for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("traintrack"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/traintrack"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/traintrack
        dirs::data_dir()
            .map(|d| d.join("traintrack"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/traintrack"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\traintrack
        dirs::data_local_dir()
            .map(|d| d.join("traintrack"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\traintrack"))
    } else {
        PathBuf::from("./traintrack_data")
    }
}
