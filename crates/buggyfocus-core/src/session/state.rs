use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// How distractions are handled during a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockMode {
    /// Detection and notification only.
    #[default]
    Gentle,
    /// Hosts-file redirection plus periodic process termination.
    Hard,
}

impl BlockMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockMode::Gentle => "gentle",
            BlockMode::Hard => "hard",
        }
    }
}

impl fmt::Display for BlockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gentle" => Ok(BlockMode::Gentle),
            "hard" => Ok(BlockMode::Hard),
            other => Err(ValidationError::InvalidValue {
                field: "blockMode".into(),
                message: format!("expected 'gentle' or 'hard', got '{other}'"),
            }),
        }
    }
}

/// Arguments of a `start` command, as sent by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub task: String,
    #[serde(default)]
    pub session_goal: Option<String>,
    #[serde(default)]
    pub blocked_sites: Vec<String>,
    #[serde(default)]
    pub blocked_apps: Vec<String>,
    #[serde(default)]
    pub block_mode: BlockMode,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub is_flow_mode: bool,
}

impl SessionConfig {
    /// A timed session for `task` lasting `minutes`.
    pub fn timed(task: impl Into<String>, minutes: u32) -> Self {
        Self {
            task: task.into(),
            duration_minutes: Some(minutes),
            ..Self::default()
        }
    }

    /// An open-ended flow session for `task`.
    pub fn flow(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            is_flow_mode: true,
            ..Self::default()
        }
    }

    pub fn with_sites<I, S>(mut self, sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_sites = sites.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_apps<I, S>(mut self, apps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_apps = apps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_block_mode(mut self, mode: BlockMode) -> Self {
        self.block_mode = mode;
        self
    }

    /// Check required fields and return the timed duration in seconds
    /// (`0` for flow mode).
    pub fn validate(&self) -> Result<i64, ValidationError> {
        if self.task.trim().is_empty() {
            return Err(ValidationError::Empty("task"));
        }
        if self.is_flow_mode {
            return Ok(0);
        }
        match self.duration_minutes {
            Some(minutes) if minutes > 0 => Ok(i64::from(minutes) * 60),
            Some(_) => Err(ValidationError::InvalidValue {
                field: "durationMinutes".into(),
                message: "must be a positive number of minutes".into(),
            }),
            None => Err(ValidationError::InvalidValue {
                field: "durationMinutes".into(),
                message: "required unless flow mode is on".into(),
            }),
        }
    }
}

/// The one live session, owned by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub active: bool,
    pub flow_mode: bool,
    pub task: String,
    pub goal: String,
    pub blocked_sites: Vec<String>,
    pub blocked_apps: Vec<String>,
    pub block_mode: BlockMode,
    /// Counts down in timed mode, up in flow mode.
    pub seconds_remaining: i64,
    pub seconds_total: i64,
    pub theme: String,
}

/// Read-only view handed out by `getSessionState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub is_session_active: bool,
    pub is_flow_mode: bool,
    pub task: String,
    pub session_goal: String,
    pub seconds_left: i64,
    pub total_seconds: i64,
    pub theme: String,
    pub block_mode: BlockMode,
}

impl From<&SessionState> for SessionSnapshot {
    fn from(state: &SessionState) -> Self {
        Self {
            is_session_active: state.active,
            is_flow_mode: state.flow_mode,
            task: state.task.clone(),
            session_goal: state.goal.clone(),
            seconds_left: state.seconds_remaining,
            total_seconds: state.seconds_total,
            theme: state.theme.clone(),
            block_mode: state.block_mode,
        }
    }
}

/// Trim entries, drop blanks and duplicates, keep first-seen order.
pub(crate) fn normalize_targets(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|seen| seen.eq_ignore_ascii_case(item)) {
            out.push(item.to_string());
        }
    }
    out
}
