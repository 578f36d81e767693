use serde::{Deserialize, Serialize};

use crate::session::BlockMode;

/// Everything the core tells the presentation layer.
///
/// Serialized as `{"type": "session-started", ...}` with camelCase fields so a
/// GUI or the CLI can consume the same stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    SessionStarted {
        task: String,
        session_goal: String,
        total_seconds: i64,
        message: String,
        theme: String,
        is_flow_mode: bool,
        block_mode: BlockMode,
    },
    /// Re-sent when the overlay reattaches to a session that is still running.
    #[serde(rename_all = "camelCase")]
    SessionRestored {
        task: String,
        session_goal: String,
        seconds_left: i64,
        total_seconds: i64,
        theme: String,
        is_flow_mode: bool,
    },
    #[serde(rename_all = "camelCase")]
    SessionExtended { new_seconds: i64, message: String },
    #[serde(rename_all = "camelCase")]
    Tick { seconds_left: i64, is_flow_mode: bool },
    TimerComplete { message: String },
    #[serde(rename_all = "camelCase")]
    SessionEnded {
        message: String,
        early: bool,
        minutes_completed: i64,
    },
    SnarkMessage { message: String },
    SiteDetected { site: String },
    /// Degraded-mode notice, e.g. hard blocking fell back to gentle.
    Warning { title: String, message: String },
}

impl Event {
    /// The wire name of the event, e.g. `"timer-complete"`.
    pub fn name(&self) -> &'static str {
        match self {
            Event::SessionStarted { .. } => "session-started",
            Event::SessionRestored { .. } => "session-restored",
            Event::SessionExtended { .. } => "session-extended",
            Event::Tick { .. } => "tick",
            Event::TimerComplete { .. } => "timer-complete",
            Event::SessionEnded { .. } => "session-ended",
            Event::SnarkMessage { .. } => "snark-message",
            Event::SiteDetected { .. } => "site-detected",
            Event::Warning { .. } => "warning",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_kebab_tag_and_camel_fields() {
        let event = Event::SessionEnded {
            message: "done".into(),
            early: false,
            minutes_completed: 25,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "session-ended");
        assert_eq!(json["minutesCompleted"], 25);
        assert_eq!(json["early"], false);
    }

    #[test]
    fn name_matches_serialized_tag() {
        let events = [
            Event::Tick {
                seconds_left: 3,
                is_flow_mode: true,
            },
            Event::SiteDetected {
                site: "reddit.com".into(),
            },
            Event::Warning {
                title: "t".into(),
                message: "m".into(),
            },
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.name());
        }
    }
}
