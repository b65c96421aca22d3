//! Focus statistics aggregation
//!
//! Keeps two rolling collections of counters in the store:
//! - `dailyStats`: one bucket per local calendar day, last 7 days kept
//! - `weeklyStats`: one bucket per Monday-aligned week, last 4 weeks kept
//!
//! Counters only ever grow. Store failures are logged and treated as empty
//! collections; nothing here returns an error to the caller.

use chrono::{Datelike, Duration, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::clock::Clock;
use crate::storage::{get_json, keys, to_json, StatsStore};

pub const DAILY_CAPACITY: usize = 7;
pub const WEEKLY_CAPACITY: usize = 4;

/// Counters for one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub date: NaiveDate,
    #[serde(rename = "focusTime", default)]
    pub focus_time_minutes: u32,
    #[serde(default)]
    pub completed_tasks: u32,
    #[serde(default)]
    pub remaining_tasks: u32,
    #[serde(default)]
    pub pomodoros_completed: u32,
}

/// Counters for one week, keyed by its Monday
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStat {
    pub week_start: NaiveDate,
    #[serde(rename = "totalFocusTime", default)]
    pub total_focus_time_minutes: u32,
    #[serde(default)]
    pub total_completed_tasks: u32,
    #[serde(default)]
    pub total_remaining_tasks: u32,
    #[serde(default)]
    pub total_pomodoros_completed: u32,
}

impl WeeklyStat {
    pub fn empty(week_start: NaiveDate) -> Self {
        Self {
            week_start,
            total_focus_time_minutes: 0,
            total_completed_tasks: 0,
            total_remaining_tasks: 0,
            total_pomodoros_completed: 0,
        }
    }
}

impl DailyStat {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            focus_time_minutes: 0,
            completed_tasks: 0,
            remaining_tasks: 0,
            pomodoros_completed: 0,
        }
    }
}

/// Everything the dashboard reads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllStats {
    pub daily: Vec<DailyStat>,
    pub weekly: Vec<WeeklyStat>,
}

/// One thing worth counting
#[derive(Debug, Clone, Copy)]
enum Contribution {
    Focus { minutes: u32 },
    Task { completed: bool },
}

/// A time-keyed counter record living in a capped collection
trait Bucket: Serialize + DeserializeOwned {
    const KEY: &'static str;
    const CAPACITY: usize;

    fn period(&self) -> NaiveDate;
    fn zeroed(period: NaiveDate) -> Self;
    fn apply(&mut self, contribution: Contribution);
}

impl Bucket for DailyStat {
    const KEY: &'static str = keys::DAILY_STATS;
    const CAPACITY: usize = DAILY_CAPACITY;

    fn period(&self) -> NaiveDate {
        self.date
    }

    fn zeroed(period: NaiveDate) -> Self {
        Self::empty(period)
    }

    fn apply(&mut self, contribution: Contribution) {
        match contribution {
            Contribution::Focus { minutes } => {
                self.focus_time_minutes = self.focus_time_minutes.saturating_add(minutes);
                self.pomodoros_completed = self.pomodoros_completed.saturating_add(1);
            }
            Contribution::Task { completed: true } => {
                self.completed_tasks = self.completed_tasks.saturating_add(1);
            }
            Contribution::Task { completed: false } => {
                self.remaining_tasks = self.remaining_tasks.saturating_add(1);
            }
        }
    }
}

impl Bucket for WeeklyStat {
    const KEY: &'static str = keys::WEEKLY_STATS;
    const CAPACITY: usize = WEEKLY_CAPACITY;

    fn period(&self) -> NaiveDate {
        self.week_start
    }

    fn zeroed(period: NaiveDate) -> Self {
        Self::empty(period)
    }

    fn apply(&mut self, contribution: Contribution) {
        match contribution {
            Contribution::Focus { minutes } => {
                self.total_focus_time_minutes =
                    self.total_focus_time_minutes.saturating_add(minutes);
                self.total_pomodoros_completed = self.total_pomodoros_completed.saturating_add(1);
            }
            Contribution::Task { completed: true } => {
                self.total_completed_tasks = self.total_completed_tasks.saturating_add(1);
            }
            Contribution::Task { completed: false } => {
                self.total_remaining_tasks = self.total_remaining_tasks.saturating_add(1);
            }
        }
    }
}

/// Index of the bucket for `period`, inserting a zeroed one at the end if
/// absent. Insertion evicts from the front until the collection fits.
fn find_or_create<B: Bucket>(buckets: &mut Vec<B>, period: NaiveDate) -> usize {
    if let Some(index) = buckets.iter().position(|b| b.period() == period) {
        return index;
    }

    buckets.push(B::zeroed(period));
    let overflow = buckets.len().saturating_sub(B::CAPACITY);
    buckets.drain(..overflow);
    buckets.len() - 1
}

/// Monday on or before `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Sole reader and writer of the persisted stats collections
pub struct StatsAggregator<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: StatsStore> StatsAggregator<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Add one completed focus session of `minutes` to today and this week
    pub fn record_focus_session(&mut self, minutes: u32) {
        self.record(Contribution::Focus { minutes });
    }

    /// Textual variant of [`record_focus_session`](Self::record_focus_session).
    /// Input that is not a non-negative integer is logged and ignored.
    pub fn record_focus_session_input(&mut self, raw: &str) -> bool {
        match raw.trim().parse::<u32>() {
            Ok(minutes) => {
                self.record_focus_session(minutes);
                true
            }
            Err(e) => {
                warn!(input = raw, error = %e, "Rejected focus session minutes");
                false
            }
        }
    }

    /// Count one task event: completed when `is_completed`, remaining otherwise
    pub fn record_task_completion(&mut self, is_completed: bool) {
        self.record(Contribution::Task {
            completed: is_completed,
        });
    }

    /// Both collections, with today's daily bucket guaranteed present
    pub fn get_all_stats(&mut self) -> AllStats {
        let today = self.clock.today();
        let mut daily: Vec<DailyStat> = self.load();

        if !daily.iter().any(|d| d.date == today) {
            find_or_create(&mut daily, today);
            match to_json(DailyStat::KEY, &daily)
                .and_then(|json| self.store.set(DailyStat::KEY, &json))
            {
                Ok(()) => {
                    // Re-read so callers see exactly what was persisted
                    let persisted: Vec<DailyStat> = self.load();
                    if persisted.iter().any(|d| d.date == today) {
                        daily = persisted;
                    }
                }
                Err(e) => warn!(error = %e, "Failed to persist today's bucket"),
            }
        }

        AllStats {
            daily,
            weekly: self.load(),
        }
    }

    fn record(&mut self, contribution: Contribution) {
        let today = self.clock.today();
        let mut daily: Vec<DailyStat> = self.load();
        let mut weekly: Vec<WeeklyStat> = self.load();

        let d = find_or_create(&mut daily, today);
        daily[d].apply(contribution);
        let w = find_or_create(&mut weekly, week_start(today));
        weekly[w].apply(contribution);

        if let Err(e) = self.persist(&daily, &weekly) {
            error!(error = %e, ?contribution, "Failed to save stats");
            return;
        }
        debug!(?contribution, daily = ?daily[d], weekly = ?weekly[w], "Recorded stats");
    }

    /// Both collections are written in a single store call
    fn persist(
        &mut self,
        daily: &[DailyStat],
        weekly: &[WeeklyStat],
    ) -> Result<(), crate::storage::StoreError> {
        let entries = [
            (DailyStat::KEY, to_json(DailyStat::KEY, daily)?),
            (WeeklyStat::KEY, to_json(WeeklyStat::KEY, weekly)?),
        ];
        self.store.set_many(&entries)
    }

    fn load<B: Bucket>(&self) -> Vec<B> {
        match get_json::<Vec<B>, S>(&self.store, B::KEY) {
            Ok(Some(buckets)) => buckets,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key = B::KEY, error = %e, "Unreadable stats, starting empty");
                Vec::new()
            }
        }
    }
}
