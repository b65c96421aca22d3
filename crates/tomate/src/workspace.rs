//! One user's timer data behind a single store
//!
//! Ties the task list and the stats aggregator together so every task
//! mutation is persisted and counted, and moves timer state in and out of
//! the store.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::dashboard::Dashboard;
use crate::engine::TimerEngine;
use crate::events::Completion;
use crate::session::{load_completed_pomodoros, load_record, save_record};
use crate::stats::{AllStats, StatsAggregator};
use crate::storage::{StatsStore, StoreError};
use crate::tasks::{Task, TaskList};

pub struct Workspace<S> {
    stats: StatsAggregator<S>,
    tasks: TaskList,
    clock: Arc<dyn Clock>,
}

impl<S: StatsStore> Workspace<S> {
    pub fn open(store: S, clock: Arc<dyn Clock>) -> Self {
        let tasks = TaskList::load(&store);
        Self {
            stats: StatsAggregator::new(store, Arc::clone(&clock)),
            tasks,
            clock,
        }
    }

    pub fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    pub fn stats_mut(&mut self) -> &mut StatsAggregator<S> {
        &mut self.stats
    }

    pub fn store(&self) -> &S {
        self.stats.store()
    }

    /// Add a task and count it as remaining
    pub fn add_task(&mut self, text: &str) -> Option<Task> {
        let task = self.tasks.add(text, self.clock.now_ms())?.clone();
        self.save_tasks();
        self.stats.record_task_completion(false);
        debug!(id = %task.id, "Added task");
        Some(task)
    }

    /// Flip a task and count its new state
    pub fn toggle_task(&mut self, id: &str) -> Option<bool> {
        let completed = self.tasks.toggle(id)?;
        self.save_tasks();
        self.stats.record_task_completion(completed);
        Some(completed)
    }

    /// Remove a task. An unfinished task is counted as remaining once more.
    pub fn delete_task(&mut self, id: &str) -> Option<Task> {
        let task = self.tasks.delete(id)?;
        self.save_tasks();
        if !task.completed {
            self.stats.record_task_completion(false);
        }
        Some(task)
    }

    /// Turn a timer completion into stats. Breaks record nothing.
    pub fn record_completion(&mut self, completion: &Completion) {
        if let Some(minutes) = completion.focus_minutes {
            self.stats.record_focus_session(minutes);
        }
    }

    /// Restore the engine from whatever was last saved
    pub fn load_timer(&self, engine: &mut TimerEngine) {
        engine.restore(&load_record(self.stats.store()));
    }

    pub fn save_timer(&mut self, engine: &TimerEngine) -> Result<(), StoreError> {
        save_record(self.stats.store_mut(), &engine.record())
    }

    pub fn all_stats(&mut self) -> AllStats {
        self.stats.get_all_stats()
    }

    pub fn dashboard(&mut self) -> Dashboard {
        let stats = self.stats.get_all_stats();
        let completed = load_completed_pomodoros(self.stats.store());
        Dashboard::build(stats, &self.tasks, completed, self.clock.today())
    }

    fn save_tasks(&mut self) {
        if let Err(e) = self.tasks.save(self.stats.store_mut()) {
            warn!(error = %e, "Failed to save tasks");
        }
    }
}
