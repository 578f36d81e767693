//! Core error types for buggyfocus-core.
//!
//! Only caller mistakes surface as errors. Failures of external resources
//! (hosts file, window polling, process termination, notifications) are
//! absorbed where they happen and turned into a no-op or a degraded mode.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for buggyfocus-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Command issued in the wrong session state
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The session service has shut down
    #[error("Session service is not running")]
    ServiceStopped,
}

/// Errors for commands that do not fit the current session state.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("a focus session is already active")]
    AlreadyActive,

    #[error("no focus session is active")]
    NotActive,
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field missing or blank
    #[error("'{0}' must not be empty")]
    Empty(&'static str),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Stats file errors. The controller absorbs these; only direct readers of
/// the log (such as the CLI) see them.
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Failed to read stats from {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write stats to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stats file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Data directory could not be resolved or created
    #[error("Failed to prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
