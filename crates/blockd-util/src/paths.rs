//! Default paths for blockd components
//!
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/blockd/blockd.sock` or `/tmp/blockd-$USER/blockd.sock`
//! - Data: `$XDG_DATA_HOME/blockd` or `~/.local/share/blockd`
//! - Config: `$XDG_CONFIG_HOME/blockd/config.toml` or `~/.config/blockd/config.toml`

use std::path::PathBuf;

/// Environment variable for overriding the socket path
pub const BLOCKD_SOCKET_ENV: &str = "BLOCKD_SOCKET";

/// Environment variable for overriding the data directory
pub const BLOCKD_DATA_DIR_ENV: &str = "BLOCKD_DATA_DIR";

/// Environment variable for overriding the config file
pub const BLOCKD_CONFIG_ENV: &str = "BLOCKD_CONFIG";

const SOCKET_FILENAME: &str = "blockd.sock";
const CONFIG_FILENAME: &str = "config.toml";
const APP_DIR: &str = "blockd";

/// Get the default socket path.
///
/// Order of precedence:
/// 1. `$BLOCKD_SOCKET` environment variable (if set)
/// 2. `$XDG_RUNTIME_DIR/blockd/blockd.sock` (if XDG_RUNTIME_DIR is set)
/// 3. `/tmp/blockd-$USER/blockd.sock` (fallback)
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(BLOCKD_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    socket_path_without_env()
}

/// Get the socket path without checking the `BLOCKD_SOCKET` env var.
pub fn socket_path_without_env() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$BLOCKD_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/blockd` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/blockd` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(BLOCKD_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking the `BLOCKD_DATA_DIR` env var.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share").join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$BLOCKD_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/blockd/config.toml`
/// 3. `~/.config/blockd/config.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(BLOCKD_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the parent directory of the socket (for creating it)
pub fn socket_dir() -> PathBuf {
    let socket_path = socket_path_without_env();
    socket_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp").join(APP_DIR))
}
