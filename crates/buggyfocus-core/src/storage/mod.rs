mod config;

pub use config::{
    BlockingConfig, Config, MonitorConfig, NotificationsConfig, SessionDefaults,
};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// Resolution order:
/// - `BUGGYFOCUS_DATA_DIR` if set
/// - `~/.config/buggyfocus-dev/` when `BUGGYFOCUS_ENV=dev`
/// - `~/.config/buggyfocus/`
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("BUGGYFOCUS_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("BUGGYFOCUS_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("buggyfocus-dev")
            } else {
                base_dir.join("buggyfocus")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

/// Location of the session log.
pub fn stats_path() -> Result<PathBuf, ConfigError> {
    Ok(data_dir()?.join("buggy-stats.json"))
}
