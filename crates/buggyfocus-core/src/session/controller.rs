//! Session lifecycle controller.
//!
//! The controller owns the single [`SessionState`] and is the only thing that
//! mutates it. It does not run threads: periodic work is requested from a
//! [`Scheduler`], and the owner routes each [`Firing`] back through
//! [`SessionController::fire`].
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Active(timed | flow) -> (Extend ->)* Completed | AbandonedEarly -> Idle
//! ```
//!
//! Every command returns the events it produced; the caller publishes them.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::state::{normalize_targets, BlockMode, SessionConfig, SessionSnapshot, SessionState};
use crate::blocking::{AppBlocker, HostsFile};
use crate::error::{Result, SessionError, ValidationError};
use crate::events::Event;
use crate::messages::{self, round_minutes, MessageContext, Mood};
use crate::monitor::DistractionMonitor;
use crate::platform::Platform;
use crate::scheduler::{Firing, Scheduler, TaskHandle, TaskKind};
use crate::stats::{StatsStore, TodayStats};
use crate::storage::Config;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);
/// Flow sessions get an encouragement line every 15 minutes.
pub const FLOW_ENCOURAGEMENT_SECS: i64 = 900;

const HARD_MODE_LIMITED_TITLE: &str = "Hard mode limited";
const HARD_MODE_LIMITED_BODY: &str =
    "Couldn't modify the system hosts file. Run as administrator for full site blocking. App blocking is still active.";

/// Timing and defaults for a controller.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub monitor_poll: Duration,
    pub debounce: Duration,
    pub app_poll: Duration,
    pub default_theme: String,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            monitor_poll: Duration::from_secs(3),
            debounce: Duration::from_secs(30),
            app_poll: Duration::from_secs(10),
            default_theme: "forest".into(),
        }
    }
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            monitor_poll: config.monitor.poll_interval(),
            debounce: config.monitor.debounce(),
            app_poll: config.blocking.app_poll_interval(),
            default_theme: config.session.theme.clone(),
        }
    }
}

pub struct SessionController<S> {
    state: SessionState,
    scheduler: S,
    platform: Platform,
    stats: StatsStore,
    hosts: HostsFile,
    settings: ControllerSettings,
    monitor: Option<DistractionMonitor>,
    app_blocker: Option<AppBlocker>,
    /// Whether our marker region is currently in the hosts file.
    sites_blocked: bool,
    tick_task: Option<TaskHandle>,
    monitor_task: Option<TaskHandle>,
    app_task: Option<TaskHandle>,
    generation: u64,
}

impl<S: Scheduler> SessionController<S> {
    pub fn new(
        scheduler: S,
        platform: Platform,
        stats: StatsStore,
        hosts: HostsFile,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            state: SessionState::default(),
            scheduler,
            platform,
            stats,
            hosts,
            settings,
            monitor: None,
            app_blocker: None,
            sites_blocked: false,
            tick_task: None,
            monitor_task: None,
            app_task: None,
            generation: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::from(&self.state)
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn stats_store(&self) -> &StatsStore {
        &self.stats
    }

    pub fn hosts_path(&self) -> PathBuf {
        self.hosts.path().to_path_buf()
    }

    pub fn is_ticking(&self) -> bool {
        self.tick_task.is_some()
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor_task.is_some()
    }

    pub fn is_blocking_apps(&self) -> bool {
        self.app_task.is_some()
    }

    pub fn is_blocking_sites(&self) -> bool {
        self.sites_blocked
    }

    /// A random line for `category`; unknown categories read as idle.
    pub fn snark(&self, category: &str) -> String {
        self.message(Mood::parse_lossy(category))
    }

    pub fn today_stats(&self) -> TodayStats {
        self.stats.today()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, config: SessionConfig) -> Result<Vec<Event>> {
        if self.state.active {
            return Err(SessionError::AlreadyActive.into());
        }
        let total = config.validate()?;
        let flow = config.is_flow_mode;

        self.state = SessionState {
            active: true,
            flow_mode: flow,
            task: config.task.trim().to_string(),
            goal: config.session_goal.unwrap_or_default(),
            blocked_sites: normalize_targets(&config.blocked_sites),
            blocked_apps: normalize_targets(&config.blocked_apps),
            block_mode: if flow { BlockMode::Gentle } else { config.block_mode },
            seconds_remaining: total,
            seconds_total: total,
            theme: config
                .theme
                .filter(|theme| !theme.trim().is_empty())
                .unwrap_or_else(|| self.settings.default_theme.clone()),
        };

        let mut events = Vec::new();
        if self.state.block_mode == BlockMode::Hard {
            self.engage_hard_mode(&mut events);
        }
        if !flow {
            self.start_monitor();
        }
        self.tick_task = Some(self.schedule(TaskKind::Tick, TICK_PERIOD));

        info!(
            task = %self.state.task,
            flow,
            block_mode = %self.state.block_mode,
            total_seconds = total,
            "Session started"
        );
        events.push(Event::SessionStarted {
            task: self.state.task.clone(),
            session_goal: self.state.goal.clone(),
            total_seconds: self.state.seconds_total,
            message: self.message(Mood::Starting),
            theme: self.state.theme.clone(),
            is_flow_mode: flow,
            block_mode: self.state.block_mode,
        });
        Ok(events)
    }

    /// Advance the timer by one second. Ignored unless the tick task is live.
    pub fn tick(&mut self) -> Vec<Event> {
        if !self.state.active || self.tick_task.is_none() {
            return Vec::new();
        }
        let mut events = Vec::with_capacity(2);

        if self.state.flow_mode {
            self.state.seconds_remaining += 1;
            events.push(self.tick_event());
            let elapsed = self.state.seconds_remaining;
            if elapsed > 0 && elapsed % FLOW_ENCOURAGEMENT_SECS == 0 {
                events.push(Event::SnarkMessage {
                    message: self.message(Mood::Flowing),
                });
            }
            return events;
        }

        self.state.seconds_remaining -= 1;
        events.push(self.tick_event());
        if self.state.seconds_remaining <= 0 {
            // Stays active: the user decides whether to extend or end.
            cancel(&mut self.tick_task);
            info!(task = %self.state.task, "Timer complete");
            events.push(Event::TimerComplete {
                message: self.message(Mood::Finished),
            });
        }
        events
    }

    pub fn extend(&mut self, minutes: u32) -> Result<Vec<Event>> {
        if !self.state.active {
            return Err(SessionError::NotActive.into());
        }
        if minutes == 0 {
            return Err(ValidationError::InvalidValue {
                field: "minutes".into(),
                message: "extension must be at least one minute".into(),
            }
            .into());
        }
        let extra = i64::from(minutes) * 60;
        self.state.seconds_remaining = extra;
        self.state.seconds_total += extra;

        cancel(&mut self.tick_task);
        self.tick_task = Some(self.schedule(TaskKind::Tick, TICK_PERIOD));

        info!(minutes, total_seconds = self.state.seconds_total, "Session extended");
        Ok(vec![Event::SessionExtended {
            new_seconds: self.state.seconds_remaining,
            message: self.message(Mood::Extending),
        }])
    }

    pub fn end(&mut self, early: bool) -> Result<Vec<Event>> {
        if !self.state.active {
            return Err(SessionError::NotActive.into());
        }
        cancel(&mut self.tick_task);

        let flow = self.state.flow_mode;
        let minutes = if flow {
            round_minutes(self.state.seconds_remaining)
        } else {
            round_minutes(self.state.seconds_total - self.state.seconds_remaining.max(0))
        };
        // Any time spent in flow counts as done.
        let completed = !early || flow;
        self.stats.record(&self.state.task, minutes, completed);

        self.state.active = false;
        self.state.flow_mode = false;
        self.stop_monitor();
        self.release_enforcement();

        let celebrate = flow || !early;
        info!(task = %self.state.task, minutes, completed, "Session ended");
        Ok(vec![Event::SessionEnded {
            message: self.message(if celebrate { Mood::Finished } else { Mood::GaveUp }),
            early: !celebrate,
            minutes_completed: minutes,
        }])
    }

    /// Re-announce a running session to a reattached overlay.
    pub fn restore(&self) -> Option<Event> {
        self.state.active.then(|| Event::SessionRestored {
            task: self.state.task.clone(),
            session_goal: self.state.goal.clone(),
            seconds_left: self.state.seconds_remaining,
            total_seconds: self.state.seconds_total,
            theme: self.state.theme.clone(),
            is_flow_mode: self.state.flow_mode,
        })
    }

    /// The machine is going to sleep: stop polling window titles.
    pub fn suspend(&mut self) {
        if self.monitor_task.is_some() {
            debug!("Suspending distraction monitor");
        }
        self.stop_monitor();
    }

    /// The machine woke up: resume polling if the session still wants it.
    pub fn resume(&mut self) {
        if self.state.active
            && !self.state.flow_mode
            && !self.state.blocked_sites.is_empty()
            && self.monitor_task.is_none()
        {
            debug!("Resuming distraction monitor");
            self.start_monitor();
        }
    }

    /// Application exit: stop every task and undo enforcement. The running
    /// session, if any, is not recorded.
    pub fn shutdown(&mut self) {
        cancel(&mut self.tick_task);
        self.stop_monitor();
        self.release_enforcement();
    }

    /// Deliver a scheduled firing. Firings from cancelled or replaced handles
    /// are dropped.
    pub fn fire(&mut self, firing: Firing) -> Vec<Event> {
        let slot = match firing.kind {
            TaskKind::Tick => &self.tick_task,
            TaskKind::MonitorPoll => &self.monitor_task,
            TaskKind::AppBlockPoll => &self.app_task,
        };
        if slot.as_ref().map(TaskHandle::firing) != Some(firing) {
            debug!(?firing, "Dropping stale firing");
            return Vec::new();
        }
        match firing.kind {
            TaskKind::Tick => self.tick(),
            TaskKind::MonitorPoll => self.poll_monitor(),
            TaskKind::AppBlockPoll => {
                self.poll_apps();
                Vec::new()
            }
        }
    }

    pub fn poll_monitor(&mut self) -> Vec<Event> {
        self.poll_monitor_at(Instant::now())
    }

    /// One distraction poll as of `now`. Title listing failures skip the poll.
    pub fn poll_monitor_at(&mut self, now: Instant) -> Vec<Event> {
        if !self.state.active || self.state.flow_mode {
            return Vec::new();
        }
        let Some(monitor) = self.monitor.as_mut() else {
            return Vec::new();
        };
        let titles = match self.platform.windows.list_window_titles() {
            Ok(titles) => titles,
            Err(e) => {
                debug!(error = %e, "Window title poll failed; skipping");
                return Vec::new();
            }
        };
        let Some(detection) = monitor.observe(&titles, now) else {
            return Vec::new();
        };

        info!(site = %detection.site, "Distraction detected");
        self.platform.notifier.notify(
            "Get back to work!",
            &format!(
                "Caught you on {}! Focus on {}",
                detection.site, self.state.task
            ),
        );
        vec![
            Event::SnarkMessage {
                message: self.message(Mood::Distracted),
            },
            Event::SiteDetected {
                site: detection.site,
            },
        ]
    }

    /// One app-blocking sweep. Returns the process names terminated.
    pub fn poll_apps(&mut self) -> Vec<String> {
        if !self.state.active {
            return Vec::new();
        }
        match &self.app_blocker {
            Some(blocker) => blocker.sweep(
                &mut *self.platform.processes,
                &mut *self.platform.notifier,
            ),
            None => Vec::new(),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn engage_hard_mode(&mut self, events: &mut Vec<Event>) {
        if !self.state.blocked_sites.is_empty() {
            if self.hosts.block(&self.state.blocked_sites) {
                self.sites_blocked = true;
            } else {
                warn!("Hosts blocking failed; falling back to gentle mode");
                self.platform
                    .notifier
                    .notify(HARD_MODE_LIMITED_TITLE, HARD_MODE_LIMITED_BODY);
                events.push(Event::Warning {
                    title: HARD_MODE_LIMITED_TITLE.into(),
                    message: HARD_MODE_LIMITED_BODY.into(),
                });
                self.state.block_mode = BlockMode::Gentle;
            }
        }

        // App blocking does not depend on the hosts file.
        let blocker = AppBlocker::new(&self.state.blocked_apps);
        if !blocker.is_empty() {
            self.app_task = Some(self.schedule(TaskKind::AppBlockPoll, self.settings.app_poll));
            self.app_blocker = Some(blocker);
        }
    }

    fn start_monitor(&mut self) {
        let monitor = DistractionMonitor::new(&self.state.blocked_sites, self.settings.debounce);
        if monitor.is_empty() {
            return;
        }
        self.monitor = Some(monitor);
        cancel(&mut self.monitor_task);
        self.monitor_task = Some(self.schedule(TaskKind::MonitorPoll, self.settings.monitor_poll));
    }

    fn stop_monitor(&mut self) {
        cancel(&mut self.monitor_task);
        if let Some(monitor) = self.monitor.as_mut() {
            monitor.reset();
        }
    }

    fn release_enforcement(&mut self) {
        if self.sites_blocked {
            self.hosts.unblock();
            self.sites_blocked = false;
        }
        cancel(&mut self.app_task);
        self.app_blocker = None;
    }

    fn schedule(&mut self, kind: TaskKind, period: Duration) -> TaskHandle {
        self.generation += 1;
        self.scheduler.schedule(
            Firing {
                kind,
                generation: self.generation,
            },
            period,
        )
    }

    fn tick_event(&self) -> Event {
        Event::Tick {
            seconds_left: self.state.seconds_remaining,
            is_flow_mode: self.state.flow_mode,
        }
    }

    fn message(&self, mood: Mood) -> String {
        messages::select(
            mood,
            MessageContext::new(&self.state.task, self.state.seconds_total),
        )
    }
}

impl<S> Drop for SessionController<S> {
    fn drop(&mut self) {
        if self.sites_blocked {
            self.hosts.unblock();
        }
    }
}

fn cancel(slot: &mut Option<TaskHandle>) {
    if let Some(mut handle) = slot.take() {
        handle.cancel();
    }
}
