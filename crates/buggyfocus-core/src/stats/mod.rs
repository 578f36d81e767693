//! Session statistics.
//!
//! Sessions are appended to a JSON log ([`StatsStore`]); streaks, per-task
//! totals and the heatmap are derived on read ([`TodayStats`]).

mod store;
mod summary;

pub use store::{SessionRecord, StatsData, StatsStore, STREAK_RETENTION_DAYS};
pub use summary::{heatmap, streak, HeatmapDay, TaskTotal, TodayStats, HEATMAP_DAYS};

impl StatsStore {
    /// Today's aggregates (UTC calendar day).
    pub fn today(&self) -> TodayStats {
        TodayStats::compute(&self.load(), chrono::Utc::now().date_naive())
    }
}
