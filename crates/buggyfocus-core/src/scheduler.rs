//! Periodic task scheduling.
//!
//! The controller never sleeps or spawns on its own. It asks a [`Scheduler`]
//! for a repeating [`Firing`] and keeps the returned [`TaskHandle`]; every
//! firing is routed back to the controller, which drops firings whose
//! generation no longer matches a live handle.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// The periodic jobs a session can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// One-second session timer.
    Tick,
    /// Window-title poll for the distraction monitor.
    MonitorPoll,
    /// Process sweep for hard-mode app blocking.
    AppBlockPoll,
}

/// One delivery of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Firing {
    pub kind: TaskKind,
    pub generation: u64,
}

/// Source of repeating firings.
pub trait Scheduler: Send {
    /// Deliver `firing` every `period`, the first one a full period from now,
    /// until the returned handle is cancelled or dropped.
    fn schedule(&mut self, firing: Firing, period: Duration) -> TaskHandle;
}

/// Cancellation handle for a scheduled task. Dropping it cancels the task.
pub struct TaskHandle {
    firing: Firing,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TaskHandle {
    pub fn new(firing: Firing, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            firing,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn firing(&self) -> Firing {
        self.firing
    }

    /// Stop the task. Calling this more than once is a no-op.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_none()
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("firing", &self.firing)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Scheduler backed by tokio intervals.
///
/// `fire` runs on the runtime for every interval tick; when it returns
/// `false` (receiver gone) the interval task exits.
#[derive(Clone)]
pub struct TokioScheduler {
    runtime: tokio::runtime::Handle,
    fire: Arc<dyn Fn(Firing) -> bool + Send + Sync>,
}

impl TokioScheduler {
    pub fn new(
        runtime: tokio::runtime::Handle,
        fire: impl Fn(Firing) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            runtime,
            fire: Arc::new(fire),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, firing: Firing, period: Duration) -> TaskHandle {
        let fire = Arc::clone(&self.fire);
        let task = self.runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if !fire(firing) {
                    break;
                }
            }
        });
        TaskHandle::new(firing, move || task.abort())
    }
}

#[derive(Debug, Clone)]
struct ManualEntry {
    firing: Firing,
    period: Duration,
    live: Arc<AtomicBool>,
}

/// Scheduler that only records what was scheduled; the owner delivers
/// firings by hand. Used for deterministic tests and step-driven embedding.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    entries: Arc<Mutex<Vec<ManualEntry>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Firings whose handles are still live.
    pub fn live(&self) -> Vec<(Firing, Duration)> {
        self.lock()
            .iter()
            .filter(|entry| entry.live.load(Ordering::SeqCst))
            .map(|entry| (entry.firing, entry.period))
            .collect()
    }

    /// The live firing of `kind`, if any.
    pub fn live_firing(&self, kind: TaskKind) -> Option<Firing> {
        self.live()
            .into_iter()
            .map(|(firing, _)| firing)
            .find(|firing| firing.kind == kind)
    }

    pub fn is_live(&self, kind: TaskKind) -> bool {
        self.live_firing(kind).is_some()
    }

    /// How many times `kind` was scheduled in total.
    pub fn scheduled_count(&self, kind: TaskKind) -> usize {
        self.lock()
            .iter()
            .filter(|entry| entry.firing.kind == kind)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ManualEntry>> {
        // A poisoned list is still a readable list.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, firing: Firing, period: Duration) -> TaskHandle {
        let live = Arc::new(AtomicBool::new(true));
        self.lock().push(ManualEntry {
            firing,
            period,
            live: Arc::clone(&live),
        });
        TaskHandle::new(firing, move || live.store(false, Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn firing(kind: TaskKind, generation: u64) -> Firing {
        Firing { kind, generation }
    }

    #[test]
    fn cancel_is_idempotent_and_drop_cancels() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut handle = TaskHandle::new(firing(TaskKind::Tick, 1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        handle.cancel();
        handle.cancel();
        drop(handle);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let counter = Arc::clone(&calls);
        let handle = TaskHandle::new(firing(TaskKind::Tick, 2), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(handle);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn manual_scheduler_tracks_live_handles() {
        let mut scheduler = ManualScheduler::new();
        let mut tick = scheduler.schedule(firing(TaskKind::Tick, 1), Duration::from_secs(1));
        let _poll = scheduler.schedule(firing(TaskKind::MonitorPoll, 2), Duration::from_secs(3));
        assert!(scheduler.is_live(TaskKind::Tick));
        assert_eq!(
            scheduler.live_firing(TaskKind::MonitorPoll),
            Some(firing(TaskKind::MonitorPoll, 2))
        );

        tick.cancel();
        assert!(!scheduler.is_live(TaskKind::Tick));
        assert_eq!(scheduler.scheduled_count(TaskKind::Tick), 1);
        assert_eq!(scheduler.live().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_fires_until_cancelled() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut scheduler = TokioScheduler::new(tokio::runtime::Handle::current(), move |f| {
            tx.send(f).is_ok()
        });
        let mut handle = scheduler.schedule(firing(TaskKind::Tick, 9), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        let mut seen = 0;
        while let Ok(f) = rx.try_recv() {
            assert_eq!(f, firing(TaskKind::Tick, 9));
            seen += 1;
        }
        assert_eq!(seen, 3);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
