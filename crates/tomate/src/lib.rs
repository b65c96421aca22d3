//! tomate - Pomodoro timer with a task checklist and local focus analytics
//!
//! The countdown is drift-corrected: it keeps an absolute target timestamp
//! and derives remaining time from the wall clock on every tick, so a
//! throttled or suspended process never loses or gains time.
//!
//! Pieces:
//! - [`engine::TimerEngine`]: the countdown state machine
//! - [`stats::StatsAggregator`]: rolling daily (7) and weekly (4) counters
//! - [`tasks::TaskList`]: the checklist
//! - [`workspace::Workspace`]: ties tasks, stats and timer persistence to one store
//! - [`storage::StatsStore`]: where all of it is kept
//!
//! Time, scheduling, sound and notifications are injected, so everything
//! above runs deterministically in tests with [`clock::ManualClock`] and
//! [`schedule::ManualSchedule`].

pub mod clock;
pub mod dashboard;
pub mod desktop;
pub mod engine;
pub mod events;
pub mod mode;
pub mod ports;
pub mod schedule;
pub mod session;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod tasks;
pub mod workspace;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dashboard::Dashboard;
pub use engine::TimerEngine;
pub use events::{Completion, TimerObserver, TimerSnapshot};
pub use mode::TimerMode;
pub use settings::TimerSettings;
pub use stats::{AllStats, DailyStat, StatsAggregator, WeeklyStat};
pub use storage::{FileStore, MemoryStore, StatsStore, StoreError};
pub use tasks::{Task, TaskList};
pub use workspace::Workspace;
