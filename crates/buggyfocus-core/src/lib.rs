//! # Buggy Focus Core Library
//!
//! Core logic for the Buggy Focus focus timer. A session runs either as a
//! countdown (timed mode) or an open-ended count-up (flow mode) while the
//! library watches for distracting windows, optionally blocks sites and apps,
//! and records finished sessions to a JSON stats log.
//!
//! ## Architecture
//!
//! - **Session controller**: the one owner of session state. It never sleeps;
//!   periodic work comes from a [`Scheduler`] and is routed back through
//!   [`SessionController::fire`].
//! - **Service**: [`FocusService`] runs the controller on a single worker and
//!   exposes async commands plus a broadcast stream of [`Event`]s.
//! - **Platform**: window titles, process termination and notifications sit
//!   behind narrow traits so tests can substitute fakes.
//! - **Storage**: TOML configuration and the JSON stats document.
//!
//! ## Key Components
//!
//! - [`SessionController`]: start, tick, extend and end sessions
//! - [`DistractionMonitor`]: debounced window-title matching
//! - [`HostsFile`] / [`AppBlocker`]: hard-mode enforcement
//! - [`StatsStore`]: session log, streaks and heatmap
//! - [`messages`]: mood-keyed canned lines

pub mod blocking;
pub mod error;
pub mod events;
pub mod messages;
pub mod monitor;
pub mod platform;
pub mod scheduler;
pub mod service;
pub mod session;
pub mod stats;
pub mod storage;

pub use blocking::{AppBlocker, HostsFile};
pub use error::{ConfigError, CoreError, Result, SessionError, StatsError, ValidationError};
pub use events::Event;
pub use messages::Mood;
pub use monitor::DistractionMonitor;
pub use platform::Platform;
pub use scheduler::{Firing, ManualScheduler, Scheduler, TaskHandle, TaskKind, TokioScheduler};
pub use service::FocusService;
pub use session::{
    BlockMode, ControllerSettings, SessionConfig, SessionController, SessionSnapshot, SessionState,
};
pub use stats::{StatsStore, TodayStats};
pub use storage::Config;
