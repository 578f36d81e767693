//! Append-only JSON session log.
//!
//! The whole document is read on demand and rewritten on every mutation.
//! There is no locking; one process owns the file.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::StatsError;

/// Days of history kept in `streakDays`.
pub const STREAK_RETENTION_DAYS: i64 = 90;

/// One finished (or abandoned) session. Never modified once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub date: NaiveDate,
    pub task: String,
    pub minutes: i64,
    pub completed: bool,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// The persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsData {
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
    #[serde(default)]
    pub streak_days: BTreeSet<NaiveDate>,
}

impl StatsData {
    /// Append a record made at `now` and update the streak days.
    pub fn push(&mut self, task: &str, minutes: i64, completed: bool, now: DateTime<Utc>) {
        let today = now.date_naive();
        self.sessions.push(SessionRecord {
            date: today,
            task: task.to_string(),
            minutes,
            completed,
            timestamp: now.timestamp_millis(),
        });
        self.streak_days.insert(today);
        self.prune_streak_days(today);
    }

    /// Drop streak days older than the retention window.
    pub fn prune_streak_days(&mut self, today: NaiveDate) {
        let cutoff = today - Duration::days(STREAK_RETENTION_DAYS);
        self.streak_days = self.streak_days.split_off(&cutoff);
    }
}

/// JSON file holding [`StatsData`].
#[derive(Debug, Clone)]
pub struct StatsStore {
    path: PathBuf,
}

impl StatsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default data-directory location.
    pub fn open_default() -> Result<Self, crate::error::ConfigError> {
        Ok(Self::new(crate::storage::stats_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unreadable log is moved before a fresh one is written.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".bak");
        PathBuf::from(name)
    }

    /// Read the document. A missing file is an empty store.
    pub fn try_load(&self) -> Result<StatsData, StatsError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StatsData::default()),
            Err(source) => {
                return Err(StatsError::ReadFailed {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&content).map_err(|source| StatsError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Read the document, falling back to an empty store on any error.
    pub fn load(&self) -> StatsData {
        self.try_load().unwrap_or_else(|e| {
            warn!(error = %e, "Could not load stats; starting from an empty log");
            StatsData::default()
        })
    }

    pub fn try_save(&self, data: &StatsData) -> Result<(), StatsError> {
        let write_failed = |source: std::io::Error| StatsError::WriteFailed {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| write_failed(std::io::Error::other(e)))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }
        fs::write(&self.path, json).map_err(write_failed)
    }

    /// Append a session stamped now. Persistence failures are logged and the
    /// updated in-memory data is still returned.
    pub fn record(&self, task: &str, minutes: i64, completed: bool) -> StatsData {
        self.record_at(task, minutes, completed, Utc::now())
    }

    /// Like [`StatsStore::record`] with an explicit clock.
    ///
    /// An unreadable log is moved to [`StatsStore::backup_path`] before the
    /// new one is written. If it cannot be moved, nothing is written.
    pub fn record_at(&self, task: &str, minutes: i64, completed: bool, now: DateTime<Utc>) -> StatsData {
        let mut data = match self.try_load() {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Could not load stats; starting a new log");
                if let Err(e) = fs::rename(&self.path, self.backup_path()) {
                    warn!(error = %e, path = %self.path.display(), "Could not back up unreadable stats; leaving them in place");
                    let mut data = StatsData::default();
                    data.push(task, minutes, completed, now);
                    return data;
                }
                StatsData::default()
            }
        };
        data.push(task, minutes, completed, now);
        match self.try_save(&data) {
            Ok(()) => debug!(task, minutes, completed, "Session recorded"),
            Err(e) => warn!(error = %e, "Could not save stats"),
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::new(dir.path().join("stats.json"));
        assert_eq!(store.try_load().unwrap(), StatsData::default());
    }

    #[test]
    fn corrupt_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        fs::write(&path, "{not json").unwrap();
        let store = StatsStore::new(&path);
        assert!(matches!(store.try_load(), Err(StatsError::Corrupt { .. })));
        assert_eq!(store.load(), StatsData::default());
    }

    #[test]
    fn record_appends_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::new(dir.path().join("stats.json"));
        store.record_at("essay", 25, true, at(2026, 3, 1));
        store.record_at("essay", 10, false, at(2026, 3, 1));

        let data = store.try_load().unwrap();
        assert_eq!(data.sessions.len(), 2);
        assert_eq!(data.sessions[0].date, day(2026, 3, 1));
        assert_eq!(data.sessions[1].minutes, 10);
        assert!(!data.sessions[1].completed);
        assert_eq!(data.streak_days.len(), 1);
    }

    #[test]
    fn document_shape_matches_wire_format() {
        let mut data = StatsData::default();
        data.push("essay", 25, true, at(2026, 3, 1));
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["streakDays"][0], "2026-03-01");
        assert_eq!(json["sessions"][0]["date"], "2026-03-01");
        assert_eq!(json["sessions"][0]["completed"], true);
        assert!(json["sessions"][0]["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn streak_days_older_than_ninety_days_are_pruned() {
        let mut data = StatsData::default();
        data.streak_days.insert(day(2025, 11, 1));
        data.streak_days.insert(day(2025, 12, 1));
        data.streak_days.insert(day(2026, 2, 28));
        data.push("essay", 25, true, at(2026, 3, 1));

        let cutoff = day(2026, 3, 1) - Duration::days(90);
        assert!(data.streak_days.iter().all(|d| *d >= cutoff));
        assert!(!data.streak_days.contains(&day(2025, 11, 1)));
        assert!(data.streak_days.contains(&day(2025, 12, 1)));
        assert!(data.streak_days.contains(&day(2026, 3, 1)));
    }

    #[test]
    fn corrupt_log_is_backed_up_before_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buggy-stats.json");
        fs::write(&path, "{\"sessions\": [tru").unwrap();
        let store = StatsStore::new(&path);
        assert_eq!(store.backup_path(), dir.path().join("buggy-stats.json.bak"));

        store.record_at("essay", 25, true, at(2026, 3, 1));
        assert_eq!(
            fs::read_to_string(store.backup_path()).unwrap(),
            "{\"sessions\": [tru"
        );
        assert_eq!(store.try_load().unwrap().sessions.len(), 1);
    }

    #[test]
    fn unwritable_location_still_returns_data() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        // Parent "directory" is a regular file, so the write must fail.
        let store = StatsStore::new(blocker.join("stats.json"));
        let data = store.record_at("essay", 5, true, at(2026, 3, 1));
        assert_eq!(data.sessions.len(), 1);
    }
}
