//! Read-side aggregates over the session log.

use chrono::{Duration, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::store::StatsData;

/// Days shown in the heatmap, ending today.
pub const HEATMAP_DAYS: i64 = 30;
/// Upper bound on how far back the streak scan looks.
const STREAK_SCAN_LIMIT: usize = 365;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTotal {
    /// Display name as first recorded today.
    pub task: String,
    /// Completed minutes only.
    pub minutes: i64,
    /// All sessions, completed or not.
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapDay {
    pub date: NaiveDate,
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayStats {
    pub total_minutes: i64,
    pub completed_count: u32,
    pub tasks: Vec<TaskTotal>,
    pub streak: u32,
    pub heatmap: Vec<HeatmapDay>,
}

impl TodayStats {
    /// Aggregate `data` as seen on `today`.
    pub fn compute(data: &StatsData, today: NaiveDate) -> Self {
        let todays = data.sessions.iter().filter(|s| s.date == today);

        let mut total_minutes = 0;
        let mut completed_count = 0;
        let mut tasks: IndexMap<String, TaskTotal> = IndexMap::new();
        for session in todays {
            let credited = if session.completed { session.minutes } else { 0 };
            total_minutes += credited;
            if session.completed {
                completed_count += 1;
            }
            let entry = tasks
                .entry(session.task.trim().to_lowercase())
                .or_insert_with(|| TaskTotal {
                    task: session.task.clone(),
                    minutes: 0,
                    count: 0,
                });
            entry.minutes += credited;
            entry.count += 1;
        }

        Self {
            total_minutes,
            completed_count,
            tasks: tasks.into_values().collect(),
            streak: streak(data, today),
            heatmap: heatmap(data, today),
        }
    }
}

/// Consecutive recorded days counting back from `today`.
///
/// A missing `today` does not end the streak; any later gap does.
pub fn streak(data: &StatsData, today: NaiveDate) -> u32 {
    let mut count = 0;
    let mut day = today;
    for step in 0..STREAK_SCAN_LIMIT {
        if data.streak_days.contains(&day) {
            count += 1;
        } else if step > 0 {
            break;
        }
        day -= Duration::days(1);
    }
    count
}

/// Completed minutes per day for the last [`HEATMAP_DAYS`] days, oldest first.
pub fn heatmap(data: &StatsData, today: NaiveDate) -> Vec<HeatmapDay> {
    (0..HEATMAP_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let minutes = data
                .sessions
                .iter()
                .filter(|s| s.date == date && s.completed)
                .map(|s| s.minutes)
                .sum();
            HeatmapDay { date, minutes }
        })
        .collect()
}
