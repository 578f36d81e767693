//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Session defaults (duration, block mode, theme)
//! - Blocking setup (hosts file location, default site/app lists)
//! - Distraction monitor timing
//! - Notification preferences
//!
//! Configuration is stored at `~/.config/buggyfocus/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::ConfigError;
use crate::session::BlockMode;

/// Defaults applied when a start command leaves a field out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDefaults {
    #[serde(default = "default_duration")]
    pub default_duration: u32,
    #[serde(default)]
    pub default_block_mode: BlockMode,
    #[serde(default = "default_theme")]
    pub theme: String,
}

/// Hard-mode enforcement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockingConfig {
    #[serde(default = "default_hosts_path")]
    pub hosts_path: PathBuf,
    #[serde(default = "default_redirect_address")]
    pub redirect_address: String,
    #[serde(default = "default_app_poll_secs")]
    pub app_poll_secs: u64,
    /// Sites blocked when a session does not name any.
    #[serde(default)]
    pub sites: Vec<String>,
    /// Apps blocked when a session does not name any.
    #[serde(default)]
    pub apps: Vec<String>,
}

/// Window-title polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,
    #[serde(default = "default_title_timeout_secs")]
    pub title_timeout_secs: u64,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/buggyfocus/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionDefaults,
    #[serde(default)]
    pub blocking: BlockingConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

fn default_duration() -> u32 {
    25
}
fn default_theme() -> String {
    "forest".into()
}
fn default_hosts_path() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\Windows\System32\drivers\etc\hosts")
    } else {
        PathBuf::from("/etc/hosts")
    }
}
fn default_redirect_address() -> String {
    "127.0.0.1".into()
}
fn default_app_poll_secs() -> u64 {
    10
}
fn default_poll_secs() -> u64 {
    3
}
fn default_debounce_secs() -> u64 {
    30
}
fn default_title_timeout_secs() -> u64 {
    3
}
fn default_true() -> bool {
    true
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            default_duration: default_duration(),
            default_block_mode: BlockMode::Gentle,
            theme: default_theme(),
        }
    }
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            hosts_path: default_hosts_path(),
            redirect_address: default_redirect_address(),
            app_poll_secs: default_app_poll_secs(),
            sites: Vec::new(),
            apps: Vec::new(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_secs: default_poll_secs(),
            debounce_secs: default_debounce_secs(),
            title_timeout_secs: default_title_timeout_secs(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionDefaults::default(),
            blocking: BlockingConfig::default(),
            monitor: MonitorConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs.max(1))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_secs)
    }

    pub fn title_timeout(&self) -> Duration {
        Duration::from_secs(self.title_timeout_secs.max(1))
    }
}

impl BlockingConfig {
    pub fn app_poll_interval(&self) -> Duration {
        Duration::from_secs(self.app_poll_secs.max(1))
    }
}

fn lookup<'a>(root: &'a serde_json::Value, key: &str) -> Option<&'a serde_json::Value> {
    if key.is_empty() {
        return None;
    }
    key.split('.').try_fold(root, |node, part| node.get(part))
}

/// Replace the leaf at `key`, coercing `raw` to the type already stored there.
fn assign(root: &mut serde_json::Value, key: &str, raw: &str) -> Result<(), ConfigError> {
    let unknown = || ConfigError::UnknownKey(key.to_string());
    let invalid = |message: String| ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    };

    let (parent_path, leaf) = match key.rsplit_once('.') {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, key),
    };
    if leaf.is_empty() {
        return Err(unknown());
    }
    let parent = match parent_path {
        Some(path) => {
            let mut node = &mut *root;
            for part in path.split('.') {
                node = node.get_mut(part).ok_or_else(unknown)?;
            }
            node
        }
        None => root,
    };
    let slot = parent
        .as_object_mut()
        .and_then(|obj| obj.get_mut(leaf))
        .ok_or_else(unknown)?;

    let value = match slot {
        serde_json::Value::Bool(_) => raw
            .parse::<bool>()
            .map(serde_json::Value::Bool)
            .map_err(|e| invalid(e.to_string()))?,
        serde_json::Value::Number(_) => raw
            .parse::<u64>()
            .map(|n| serde_json::Value::Number(n.into()))
            .map_err(|_| invalid(format!("cannot parse '{raw}' as a whole number")))?,
        serde_json::Value::Array(_) => {
            // Accept either JSON (`["a","b"]`) or a comma-separated list.
            if raw.trim_start().starts_with('[') {
                serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?
            } else {
                serde_json::Value::Array(
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| serde_json::Value::String(s.to_string()))
                        .collect(),
                )
            }
        }
        serde_json::Value::Object(_) => return Err(unknown()),
        _ => serde_json::Value::String(raw.to_string()),
    };
    *slot = value;
    Ok(())
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Path of the config file in the data directory.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Self::path()
    }

    /// Load from disk or create and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Same as [`Config::load`] for an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match lookup(&json, key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit
    /// the key's type.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        assign(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by key and save.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "Falling back to default configuration");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.session.default_duration, 25);
        assert_eq!(parsed.monitor.debounce_secs, 30);
        assert_eq!(parsed.session.default_block_mode, BlockMode::Gentle);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let parsed: Config = toml::from_str("[monitor]\npoll_secs = 5\n").unwrap();
        assert_eq!(parsed.monitor.poll_secs, 5);
        assert_eq!(parsed.monitor.title_timeout_secs, 3);
        assert_eq!(parsed.blocking.app_poll_secs, 10);
        assert_eq!(parsed.session.theme, "forest");
        assert!(parsed.notifications.enabled);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("session.default_duration").as_deref(), Some("25"));
        assert_eq!(cfg.get("session.default_block_mode").as_deref(), Some("gentle"));
        assert_eq!(cfg.get("notifications.enabled").as_deref(), Some("true"));
        assert!(cfg.get("session.missing").is_none());
        assert!(cfg.get("session").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn apply_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.apply("monitor.debounce_secs", "45").unwrap();
        cfg.apply("notifications.enabled", "false").unwrap();
        cfg.apply("session.default_block_mode", "hard").unwrap();
        cfg.apply("blocking.sites", "reddit.com, youtube.com").unwrap();
        cfg.apply("blocking.apps", r#"["discord"]"#).unwrap();

        assert_eq!(cfg.monitor.debounce_secs, 45);
        assert!(!cfg.notifications.enabled);
        assert_eq!(cfg.session.default_block_mode, BlockMode::Hard);
        assert_eq!(cfg.blocking.sites, vec!["reddit.com", "youtube.com"]);
        assert_eq!(cfg.blocking.apps, vec!["discord"]);
    }

    #[test]
    fn apply_rejects_unknown_keys_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("monitor.nope", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.apply("monitor", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.apply("notifications.enabled", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.apply("session.default_block_mode", "nuclear"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg.session.default_block_mode, BlockMode::Gentle);
    }

    #[test]
    fn load_from_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.session.default_duration, 25);

        let mut changed = cfg.clone();
        changed.apply("session.theme", "ocean").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().session.theme, "ocean");
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "session = 3").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
