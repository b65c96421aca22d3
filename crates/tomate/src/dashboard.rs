//! Analytics dashboard view
//!
//! Two different things get counted and both are shown:
//! - lifetime event counts from the stats buckets (every add, toggle and
//!   completion ever recorded)
//! - a live snapshot of the task list as it stands right now

use chrono::NaiveDate;
use serde::Serialize;

use crate::stats::{week_start, AllStats, DailyStat, WeeklyStat};
use crate::tasks::TaskList;

/// Counts taken from the current task list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub completed: usize,
    pub remaining: usize,
}

impl TaskSnapshot {
    pub fn of(tasks: &TaskList) -> Self {
        Self {
            completed: tasks.completed_count(),
            remaining: tasks.remaining_count(),
        }
    }

    pub fn total(&self) -> usize {
        self.completed + self.remaining
    }

    /// Share of tasks done, in percent
    pub fn completion_rate(&self) -> u32 {
        if self.total() == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total() as f64) * 100.0).round() as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Local date the view was built for
    pub date: NaiveDate,
    /// Oldest first
    pub daily: Vec<DailyStat>,
    pub current_week: WeeklyStat,
    pub live: TaskSnapshot,
    pub completed_pomodoros: u32,
}

impl Dashboard {
    pub fn build(stats: AllStats, tasks: &TaskList, completed_pomodoros: u32, today: NaiveDate) -> Self {
        let AllStats { mut daily, weekly } = stats;
        daily.sort_by_key(|d| d.date);

        // The most recently created weekly bucket is the current week
        let current_week = weekly
            .into_iter()
            .last()
            .unwrap_or_else(|| WeeklyStat::empty(week_start(today)));

        Self {
            date: today,
            daily,
            current_week,
            live: TaskSnapshot::of(tasks),
            completed_pomodoros,
        }
    }

    /// The bucket for the build date; not necessarily the newest one when
    /// the local date has moved backwards
    pub fn today(&self) -> Option<&DailyStat> {
        self.daily.iter().find(|d| d.date == self.date)
    }

    /// Largest daily focus time, for scaling charts
    pub fn max_daily_focus(&self) -> u32 {
        self.daily
            .iter()
            .map(|d| d.focus_time_minutes)
            .max()
            .unwrap_or(0)
    }
}
