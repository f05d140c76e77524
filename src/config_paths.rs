//! Where hilite keeps its files
//!
//! ```text
//! <config root>/hilite/
//! ├── config.yaml   session defaults, read by `SessionConfig::load`
//! └── logs/         daily `hilite.log` files from `tracing::init`
//! ```
//!
//! The config root is `$XDG_CONFIG_HOME`, falling back to `~/.config`.
//! On Windows it is `%APPDATA%`.

use std::{
    env,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

const APP_DIR: &str = "hilite";
const CONFIG_FILE: &str = "config.yaml";
const LOGS_DIR: &str = "logs";

/// The hilite directory under the platform config root
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        env::var_os("APPDATA").map(|appdata| PathBuf::from(appdata).join(APP_DIR))
    }

    #[cfg(not(target_os = "windows"))]
    {
        app_dir_under(env::var_os("XDG_CONFIG_HOME"), dirs::home_dir())
    }
}

/// An empty `XDG_CONFIG_HOME` counts as unset
pub fn app_dir_under(xdg_config_home: Option<OsString>, home: Option<PathBuf>) -> Option<PathBuf> {
    xdg_config_home
        .filter(|xdg| !xdg.is_empty())
        .map(PathBuf::from)
        .or_else(|| home.map(|h| h.join(".config")))
        .map(|root| root.join(APP_DIR))
}

pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

pub fn logs_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(LOGS_DIR))
}

/// Logs directory, created on first use
pub fn ensure_logs_dir() -> Result<PathBuf, String> {
    let dir = logs_dir().ok_or_else(|| "No config directory available".to_string())?;
    ensure_dir(&dir)?;
    Ok(dir)
}

fn ensure_dir(dir: &Path) -> Result<(), String> {
    fs::create_dir_all(dir).map_err(|e| format!("Failed to create {}: {}", dir.display(), e))
}
