//! Async front end for the session controller.
//!
//! One blocking worker owns the [`SessionController`] and handles commands
//! strictly in arrival order. Scheduled firings arrive on the same queue, so a
//! tick can never interleave with `end` or `extend`. Events are published on a
//! broadcast channel.

use std::time::{Duration, Instant, SystemTime};

use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::blocking::HostsFile;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::platform::Platform;
use crate::scheduler::{Firing, TokioScheduler};
use crate::session::{ControllerSettings, SessionConfig, SessionController, SessionSnapshot};
use crate::stats::{StatsStore, TodayStats};
use crate::storage::Config;

const EVENT_BUFFER: usize = 256;
/// How often the sleep detector samples the clocks.
const WAKE_CHECK_PERIOD: Duration = Duration::from_secs(5);
/// Wall-clock drift beyond the monotonic clock that counts as a sleep.
const WAKE_THRESHOLD: Duration = Duration::from_secs(15);

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Start(SessionConfig, Reply<Result<()>>),
    Extend(u32, Reply<Result<()>>),
    End(bool, Reply<Result<()>>),
    Snark(String, Reply<String>),
    Stats(Reply<TodayStats>),
    State(Reply<SessionSnapshot>),
    Restore(Reply<bool>),
    Suspend,
    Resume,
    Shutdown(Reply<()>),
    Fire(Firing),
}

/// Cloneable handle to the running service.
///
/// The worker stops after [`FocusService::shutdown`] or once every handle is
/// dropped; either way site blocking is reverted.
#[derive(Clone)]
pub struct FocusService {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<Event>,
}

impl FocusService {
    /// Start the worker on the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn spawn(
        platform: Platform,
        stats: StatsStore,
        hosts: HostsFile,
        settings: ControllerSettings,
    ) -> Self {
        let runtime = Handle::current();
        let (commands, mut inbox) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let firings = commands.downgrade();
        let scheduler = TokioScheduler::new(runtime.clone(), move |firing| {
            firings
                .upgrade()
                .is_some_and(|tx| tx.send(Command::Fire(firing)).is_ok())
        });
        let controller = SessionController::new(scheduler, platform, stats, hosts, settings);

        let publisher = events.clone();
        runtime.spawn_blocking(move || run(controller, &mut inbox, &publisher));
        runtime.spawn(watch_for_sleep(commands.downgrade()));

        Self { commands, events }
    }

    /// Service wired to the desktop platform and the configured paths.
    pub fn from_config(config: &Config) -> Result<Self> {
        let platform = Platform::desktop(
            config.monitor.title_timeout(),
            config.notifications.enabled,
        );
        let stats = StatsStore::open_default()?;
        let hosts = HostsFile::new(
            config.blocking.hosts_path.clone(),
            config.blocking.redirect_address.clone(),
        );
        Ok(Self::spawn(platform, stats, hosts, ControllerSettings::from(config)))
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub async fn start(&self, config: SessionConfig) -> Result<()> {
        self.request(|reply| Command::Start(config, reply)).await?
    }

    pub async fn extend(&self, minutes: u32) -> Result<()> {
        self.request(|reply| Command::Extend(minutes, reply)).await?
    }

    pub async fn end(&self, early: bool) -> Result<()> {
        self.request(|reply| Command::End(early, reply)).await?
    }

    pub async fn snark(&self, category: impl Into<String>) -> Result<String> {
        let category = category.into();
        self.request(|reply| Command::Snark(category, reply)).await
    }

    pub async fn stats(&self) -> Result<TodayStats> {
        self.request(Command::Stats).await
    }

    pub async fn state(&self) -> Result<SessionSnapshot> {
        self.request(Command::State).await
    }

    /// Re-publish the running session. Returns `false` when idle.
    pub async fn restore(&self) -> Result<bool> {
        self.request(Command::Restore).await
    }

    pub fn suspend(&self) -> Result<()> {
        self.send(Command::Suspend)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(Command::Resume)
    }

    /// Stop all tasks, revert blocking and stop the worker. The active
    /// session, if any, is not recorded.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(Command::Shutdown).await
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| CoreError::ServiceStopped)
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply))?;
        response.await.map_err(|_| CoreError::ServiceStopped)
    }
}

fn run(
    mut controller: SessionController<TokioScheduler>,
    inbox: &mut mpsc::UnboundedReceiver<Command>,
    events: &broadcast::Sender<Event>,
) {
    let publish = |produced: Vec<Event>| {
        for event in produced {
            // No subscribers is fine.
            let _ = events.send(event);
        }
    };

    while let Some(command) = inbox.blocking_recv() {
        match command {
            Command::Start(config, reply) => {
                let _ = reply.send(controller.start(config).map(&publish));
            }
            Command::Extend(minutes, reply) => {
                let _ = reply.send(controller.extend(minutes).map(&publish));
            }
            Command::End(early, reply) => {
                let _ = reply.send(controller.end(early).map(&publish));
            }
            Command::Snark(category, reply) => {
                let _ = reply.send(controller.snark(&category));
            }
            Command::Stats(reply) => {
                let _ = reply.send(controller.today_stats());
            }
            Command::State(reply) => {
                let _ = reply.send(controller.snapshot());
            }
            Command::Restore(reply) => {
                let restored = controller.restore();
                let found = restored.is_some();
                publish(restored.into_iter().collect());
                let _ = reply.send(found);
            }
            Command::Suspend => controller.suspend(),
            Command::Resume => controller.resume(),
            Command::Fire(firing) => publish(controller.fire(firing)),
            Command::Shutdown(reply) => {
                controller.shutdown();
                let _ = reply.send(());
                info!("Focus service shut down");
                return;
            }
        }
    }

    controller.shutdown();
    debug!("All service handles dropped; worker stopped");
}

/// Issue suspend/resume when the wall clock jumps ahead of the monotonic
/// clock, which is what a machine sleep looks like from user space.
async fn watch_for_sleep(commands: mpsc::WeakUnboundedSender<Command>) {
    let mut interval = tokio::time::interval(WAKE_CHECK_PERIOD);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await;

    let mut last_wall = SystemTime::now();
    let mut last_mono = Instant::now();
    loop {
        interval.tick().await;
        let Some(tx) = commands.upgrade() else {
            return;
        };
        let wall = SystemTime::now();
        let mono = Instant::now();
        let wall_elapsed = wall.duration_since(last_wall).unwrap_or_default();
        if slept(wall_elapsed, mono.duration_since(last_mono)) {
            warn!(?wall_elapsed, "Wall clock jumped; treating as sleep and wake");
            if tx.send(Command::Suspend).is_err() || tx.send(Command::Resume).is_err() {
                return;
            }
        }
        last_wall = wall;
        last_mono = mono;
    }
}

fn slept(wall_elapsed: Duration, mono_elapsed: Duration) -> bool {
    wall_elapsed.saturating_sub(mono_elapsed) > WAKE_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::platform::{NullNotifier, ProcessControl, WindowInspector};
    use std::io;

    struct NoWindows;

    impl WindowInspector for NoWindows {
        fn list_window_titles(&mut self) -> io::Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    struct NoProcesses;

    impl ProcessControl for NoProcesses {
        fn terminate_process(&mut self, _name: &str) -> bool {
            false
        }
    }

    fn service(dir: &tempfile::TempDir) -> FocusService {
        FocusService::spawn(
            Platform::new(NoWindows, NoProcesses, NullNotifier),
            StatsStore::new(dir.path().join("stats.json")),
            HostsFile::new(dir.path().join("hosts"), "127.0.0.1"),
            ControllerSettings::default(),
        )
    }

    async fn next(events: &mut broadcast::Receiver<Event>) -> Event {
        tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("event within five seconds")
            .expect("channel open")
    }

    #[test]
    fn sleep_detection_needs_a_real_jump() {
        assert!(!slept(Duration::from_secs(5), Duration::from_secs(5)));
        assert!(!slept(Duration::from_secs(19), Duration::from_secs(5)));
        assert!(slept(Duration::from_secs(600), Duration::from_secs(5)));
        assert!(!slept(Duration::ZERO, Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn session_runs_through_the_worker() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);
        let mut events = service.subscribe();

        service
            .start(SessionConfig::timed("essay", 1))
            .await
            .unwrap();
        assert!(matches!(next(&mut events).await, Event::SessionStarted { total_seconds: 60, .. }));
        assert_eq!(
            next(&mut events).await,
            Event::Tick {
                seconds_left: 59,
                is_flow_mode: false
            }
        );

        let err = service.start(SessionConfig::timed("other", 5)).await.unwrap_err();
        assert!(matches!(err, CoreError::Session(SessionError::AlreadyActive)));

        let state = service.state().await.unwrap();
        assert!(state.is_session_active);
        assert_eq!(state.task, "essay");

        assert!(service.restore().await.unwrap());
        service.end(true).await.unwrap();
        loop {
            match next(&mut events).await {
                Event::SessionEnded { early, .. } => {
                    assert!(early);
                    break;
                }
                Event::Tick { .. } | Event::SessionRestored { .. } => continue,
                other => panic!("unexpected event {other:?}"),
            }
        }

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.completed_count, 0);
        assert_eq!(stats.tasks.len(), 1);
        assert!(!service.state().await.unwrap().is_session_active);
    }

    #[tokio::test]
    async fn commands_fail_after_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);
        service.start(SessionConfig::flow("reading")).await.unwrap();
        service.shutdown().await.unwrap();

        let err = service.state().await.unwrap_err();
        assert!(matches!(err, CoreError::ServiceStopped));
        // Shutdown does not record the abandoned session.
        assert!(!dir.path().join("stats.json").exists());
    }

    #[tokio::test]
    async fn snark_uses_the_requested_mood() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir);
        let line = service.snark("finished").await.unwrap();
        assert!(!line.is_empty());
    }
}
