pub mod generate;
pub mod parse;
pub mod types;

use std::path::{Path, PathBuf};

pub use parse::{load, load_config, ConfigError};
pub use types::{Config, ConfigOverrides};

const USER_CONFIG: &str = ".config/awslogger/config.yml";
const SYSTEM_CONFIG: &str = "/etc/awslogger/config.yml";

/// Expands a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    } else if path_str == "~" {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir;
        }
    }

    path.to_path_buf()
}

/// Picks the config file to load:
/// 1. Explicit path (with tilde expansion)
/// 2. ~/.config/awslogger/config.yml
/// 3. /etc/awslogger/config.yml
///
/// None means no file; defaults and flags are used on their own.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from(SYSTEM_CONFIG);
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(USER_CONFIG))
}

pub fn system_config_path() -> PathBuf {
    PathBuf::from(SYSTEM_CONFIG)
}
