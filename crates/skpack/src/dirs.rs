//! Platform directories used by skpack

use std::path::PathBuf;

use etcetera::{BaseStrategy, choose_base_strategy};

/// Name of the configuration file, both per user and per project
pub const CONFIG_FILE_NAME: &str = "skpack.toml";

/// Overrides the per-user configuration directory
pub const CONFIG_DIR_ENV: &str = "SKPACK_CONFIG_DIR";

/// Per-user configuration directory (`~/.config/skpack` on Linux)
pub fn user_config_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    choose_base_strategy()
        .ok()
        .map(|strategy| strategy.config_dir().join("skpack"))
}

/// Per-user configuration file, whether or not it exists
pub fn user_config_file() -> Option<PathBuf> {
    user_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}
