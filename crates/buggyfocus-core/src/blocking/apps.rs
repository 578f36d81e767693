//! Hard-mode app blocking: terminate listed apps on every sweep.

use tracing::debug;

use crate::platform::{Notifier, ProcessControl};

/// Product names whose executable is named differently.
const PROCESS_ALIASES: &[(&str, &str)] = &[
    ("discord", "Discord"),
    ("slack", "Slack"),
    ("spotify", "Spotify"),
    ("steam", "steam"),
    ("telegram", "Telegram"),
    ("notion", "Notion"),
    ("chrome", "chrome"),
    ("firefox", "firefox"),
    ("edge", "msedge"),
    ("brave", "brave"),
];

/// Map a user-facing app name to the process name to terminate.
pub fn process_name_for(app: &str) -> String {
    let app = app.trim();
    let lower = app.to_ascii_lowercase();
    PROCESS_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, process)| (*process).to_string())
        .unwrap_or_else(|| app.to_string())
}

/// The process names targeted for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppBlocker {
    process_names: Vec<String>,
}

impl AppBlocker {
    pub fn new(apps: &[String]) -> Self {
        let mut process_names: Vec<String> = Vec::with_capacity(apps.len());
        for name in apps.iter().map(|app| process_name_for(app)) {
            if !name.is_empty() && !process_names.contains(&name) {
                process_names.push(name);
            }
        }
        Self { process_names }
    }

    pub fn process_names(&self) -> &[String] {
        &self.process_names
    }

    pub fn is_empty(&self) -> bool {
        self.process_names.is_empty()
    }

    /// Try to terminate every target once. Apps that are not running are
    /// skipped silently; each termination raises a notification.
    /// Returns the names that were terminated.
    pub fn sweep(&self, processes: &mut dyn ProcessControl, notifier: &mut dyn Notifier) -> Vec<String> {
        let mut terminated = Vec::new();
        for name in &self.process_names {
            if processes.terminate_process(name) {
                notifier.notify("App blocked", &format!("{name} was closed. Focus!"));
                terminated.push(name.clone());
            } else {
                debug!(process = %name, "Not running");
            }
        }
        terminated
    }
}
