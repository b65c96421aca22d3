//! Timer notifications for presentation layers

use serde::Serialize;

use crate::mode::TimerMode;

/// Point-in-time view of the timer, handed to observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub mode: TimerMode,
    pub remaining_seconds: u64,
    pub duration_seconds: u64,
    pub running: bool,
    /// 0.0 at the start of a countdown, 1.0 at completion
    pub progress: f64,
    pub completed_focus_sessions: u32,
    pub sound_enabled: bool,
}

/// Emitted exactly once when a countdown reaches zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub mode: TimerMode,
    /// Minutes to record as focus time; `None` for breaks
    pub focus_minutes: Option<u32>,
}

/// Subscriber interface for timer updates. Every method defaults to a no-op.
pub trait TimerObserver {
    /// Displayed remaining time changed
    fn on_tick(&mut self, _snapshot: &TimerSnapshot) {}

    /// A countdown finished
    fn on_complete(&mut self, _completion: &Completion) {}

    /// Started, paused, reset, mode switched, restored or completed
    fn on_state_change(&mut self, _snapshot: &TimerSnapshot) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    pub enum Recorded {
        Tick(u64),
        Complete(Completion),
        State { running: bool, remaining: u64 },
    }

    /// Observer that records everything it sees; clones share the log
    #[derive(Clone, Default)]
    pub struct EventLog {
        events: Arc<Mutex<Vec<Recorded>>>,
    }

    impl EventLog {
        pub fn events(&self) -> Vec<Recorded> {
            self.events.lock().unwrap().clone()
        }

        pub fn completions(&self) -> usize {
            self.events()
                .iter()
                .filter(|e| matches!(e, Recorded::Complete(_)))
                .count()
        }

        pub fn ticks(&self) -> Vec<u64> {
            self.events()
                .iter()
                .filter_map(|e| match e {
                    Recorded::Tick(r) => Some(*r),
                    _ => None,
                })
                .collect()
        }
    }

    impl TimerObserver for EventLog {
        fn on_tick(&mut self, snapshot: &TimerSnapshot) {
            self.events
                .lock()
                .unwrap()
                .push(Recorded::Tick(snapshot.remaining_seconds));
        }

        fn on_complete(&mut self, completion: &Completion) {
            self.events
                .lock()
                .unwrap()
                .push(Recorded::Complete(*completion));
        }

        fn on_state_change(&mut self, snapshot: &TimerSnapshot) {
            self.events.lock().unwrap().push(Recorded::State {
                running: snapshot.running,
                remaining: snapshot.remaining_seconds,
            });
        }
    }
}
