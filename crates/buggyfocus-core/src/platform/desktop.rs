//! Default capability implementations.
//!
//! Window titles come from a platform shell command (PowerShell, AppleScript,
//! `wmctrl`), processes are terminated through `sysinfo`, and notifications go
//! through `notify-rust`.

use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use sysinfo::System;
use tracing::{debug, info};

use super::{Notifier, ProcessControl, WindowInspector};

/// Runs a shell command that prints visible window titles, killing it after
/// `timeout`.
#[derive(Debug, Clone)]
pub struct ShellWindowInspector {
    timeout: Duration,
}

impl ShellWindowInspector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl WindowInspector for ShellWindowInspector {
    fn list_window_titles(&mut self) -> io::Result<Vec<String>> {
        let output = run_with_timeout(title_command(), self.timeout)?;
        Ok(parse_titles(&output))
    }
}

#[cfg(windows)]
fn title_command() -> Command {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;

    let mut cmd = Command::new("powershell");
    cmd.args([
        "-NoProfile",
        "-Command",
        "Get-Process | ForEach-Object { $_.MainWindowTitle } | Where-Object { $_ }",
    ])
    .creation_flags(CREATE_NO_WINDOW);
    cmd
}

#[cfg(target_os = "macos")]
fn title_command() -> Command {
    let mut cmd = Command::new("osascript");
    cmd.args([
        "-e",
        "tell application \"System Events\" to get name of every window of (every process whose visible is true)",
    ]);
    cmd
}

#[cfg(not(any(windows, target_os = "macos")))]
fn title_command() -> Command {
    let mut cmd = Command::new("wmctrl");
    cmd.arg("-l");
    cmd
}

#[cfg(windows)]
fn parse_titles(output: &str) -> Vec<String> {
    non_empty_lines(output.lines())
}

#[cfg(target_os = "macos")]
fn parse_titles(output: &str) -> Vec<String> {
    non_empty_lines(output.split(", "))
}

// `wmctrl -l` rows: `<id> <desktop> <host> <title...>`
#[cfg(not(any(windows, target_os = "macos")))]
fn parse_titles(output: &str) -> Vec<String> {
    let titles = output
        .lines()
        .map(|line| line.split_whitespace().skip(3).collect::<Vec<_>>().join(" "));
    non_empty_lines(titles)
}

fn non_empty_lines<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Run `command`, capture stdout, and give up after `timeout`.
fn run_with_timeout(mut command: Command, timeout: Duration) -> io::Result<String> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("stdout was not captured"))?;
    // Drain on a separate thread so a chatty child cannot fill the pipe and stall.
    let reader = std::thread::spawn(move || {
        let mut buf = String::new();
        stdout.read_to_string(&mut buf).map(|_| buf)
    });

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            let output = reader
                .join()
                .map_err(|_| io::Error::other("stdout reader panicked"))??;
            if !status.success() {
                return Err(io::Error::other(format!("command exited with {status}")));
            }
            return Ok(output);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("command did not finish within {timeout:?}"),
            ));
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}

/// Terminates processes by matching their executable name.
pub struct SysinfoProcessControl {
    system: System,
}

impl SysinfoProcessControl {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoProcessControl {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessControl for SysinfoProcessControl {
    fn terminate_process(&mut self, name: &str) -> bool {
        let wanted = executable_stem(name);
        if wanted.is_empty() {
            return false;
        }
        self.system.refresh_processes();
        let mut terminated = false;
        for process in self.system.processes().values() {
            if executable_stem(process.name()) == wanted && process.kill() {
                debug!(pid = %process.pid(), name, "Terminated process");
                terminated = true;
            }
        }
        terminated
    }
}

/// Lower-cased executable name without a trailing `.exe`.
pub(crate) fn executable_stem(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    match lower.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => lower,
    }
}

/// Desktop notifications via the OS notification service.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    enabled: bool,
}

impl DesktopNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&mut self, title: &str, body: &str) {
        info!(title, body, "Notification");
        if !self.enabled {
            return;
        }
        if let Err(e) = notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .appname("Buggy Focus")
            .show()
        {
            debug!(error = %e, "Desktop notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executable_stem_normalizes_case_and_suffix() {
        assert_eq!(executable_stem("Discord.exe"), "discord");
        assert_eq!(executable_stem(" msedge "), "msedge");
        assert_eq!(executable_stem("EXE"), "exe");
    }

    #[test]
    fn non_empty_lines_trims_and_filters() {
        assert_eq!(
            non_empty_lines(["  Inbox - Mail ", "", "   ", "reddit"]),
            vec!["Inbox - Mail", "reddit"]
        );
    }

    #[cfg(not(any(windows, target_os = "macos")))]
    #[test]
    fn wmctrl_rows_keep_only_titles() {
        let out = "0x03a00003  0 host Reddit - Mozilla Firefox\n0x04000001 -1 host \n";
        assert_eq!(parse_titles(out), vec!["Reddit - Mozilla Firefox"]);
    }

    #[cfg(unix)]
    #[test]
    fn run_with_timeout_captures_output() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo hello"]);
        let out = run_with_timeout(cmd, Duration::from_secs(5)).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn run_with_timeout_kills_slow_commands() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "sleep 5"]);
        let started = Instant::now();
        let err = run_with_timeout(cmd, Duration::from_millis(200)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn run_with_timeout_reports_failure_status() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "exit 3"]);
        assert!(run_with_timeout(cmd, Duration::from_secs(5)).is_err());
    }
}
