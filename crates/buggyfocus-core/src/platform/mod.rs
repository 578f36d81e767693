//! Narrow OS capabilities the core depends on.
//!
//! Every call is best-effort. Implementations must not panic and must bound
//! their own run time; the controller treats any failure as "nothing seen"
//! or "nothing done".

mod desktop;

pub use desktop::{DesktopNotifier, ShellWindowInspector, SysinfoProcessControl};

use std::io;

/// Lists the titles of currently visible windows.
pub trait WindowInspector: Send {
    fn list_window_titles(&mut self) -> io::Result<Vec<String>>;
}

/// Terminates processes by executable name.
pub trait ProcessControl: Send {
    /// Returns `true` if at least one matching process was terminated.
    fn terminate_process(&mut self, name: &str) -> bool;
}

/// Delivers user-facing system notifications.
pub trait Notifier: Send {
    fn notify(&mut self, title: &str, body: &str);
}

/// The set of OS capabilities handed to the controller.
pub struct Platform {
    pub windows: Box<dyn WindowInspector>,
    pub processes: Box<dyn ProcessControl>,
    pub notifier: Box<dyn Notifier>,
}

impl Platform {
    pub fn new(
        windows: impl WindowInspector + 'static,
        processes: impl ProcessControl + 'static,
        notifier: impl Notifier + 'static,
    ) -> Self {
        Self {
            windows: Box::new(windows),
            processes: Box::new(processes),
            notifier: Box::new(notifier),
        }
    }

    /// Shell/sysinfo-backed capabilities for the current OS.
    pub fn desktop(title_timeout: std::time::Duration, notifications_enabled: bool) -> Self {
        Self::new(
            ShellWindowInspector::new(title_timeout),
            SysinfoProcessControl::new(),
            DesktopNotifier::new(notifications_enabled),
        )
    }
}

/// Notifier that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&mut self, _title: &str, _body: &str) {}
}
