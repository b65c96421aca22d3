//! Task checklist
//!
//! A flat list of short to-do items persisted under `tasks`. Ids are
//! creation timestamps in epoch milliseconds, stored as strings and bumped
//! when two tasks are added within the same millisecond.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::storage::{get_json, keys, to_json, StatsStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

/// Ids are written as strings; lists saved with numeric ids still load
fn id_from_string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the persisted list; unreadable data gives an empty list
    pub fn load<S: StatsStore + ?Sized>(store: &S) -> Self {
        match get_json::<Vec<Task>, S>(store, keys::TASKS) {
            Ok(tasks) => Self {
                tasks: tasks.unwrap_or_default(),
            },
            Err(e) => {
                warn!(error = %e, "Unreadable task list, starting empty");
                Self::default()
            }
        }
    }

    pub fn save<S: StatsStore + ?Sized>(&self, store: &mut S) -> Result<(), StoreError> {
        let json = to_json(keys::TASKS, &self.tasks)?;
        store.set(keys::TASKS, &json)
    }

    /// Append a task. Blank text is ignored.
    pub fn add(&mut self, text: &str, now_ms: i64) -> Option<&Task> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let mut stamp = now_ms;
        while self.get(&stamp.to_string()).is_some() {
            stamp += 1;
        }
        self.tasks.push(Task {
            id: stamp.to_string(),
            text: text.to_string(),
            completed: false,
        });
        self.tasks.last()
    }

    /// Flip a task's completed flag, returning the new value
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        task.completed = !task.completed;
        Some(task.completed)
    }

    pub fn delete(&mut self, id: &str) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(index))
    }

    /// Find a task by id, or by its 1-based position in the list
    pub fn resolve(&self, ident: &str) -> Option<String> {
        let ident = ident.trim();
        if let Some(task) = self.get(ident) {
            return Some(task.id.clone());
        }
        let index = ident.parse::<usize>().ok()?.checked_sub(1)?;
        self.tasks.get(index).map(|t| t.id.clone())
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    pub fn remaining_count(&self) -> usize {
        self.len() - self.completed_count()
    }
}
