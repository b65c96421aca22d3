//! Recomputation schedules
//!
//! A schedule is the repeating, cancellable callback that prompts the engine
//! to recompute remaining time. It is advisory only: the engine derives
//! remaining time from its absolute target timestamp, so late, dropped or
//! bunched ticks change nothing but display latency.
//!
//! The engine cancels before every install, so at most one schedule is
//! outstanding at any time.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A repeating callback the engine can install and cancel
pub trait Schedule {
    /// Begin firing every `period`
    fn install(&mut self, period: Duration);

    /// Stop firing. A no-op when nothing is installed.
    fn cancel(&mut self);

    fn is_active(&self) -> bool;
}

/// Counters kept by [`ManualSchedule`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleCounts {
    pub installs: usize,
    pub cancels: usize,
    pub outstanding: usize,
    pub max_outstanding: usize,
}

/// A schedule that never fires on its own. The owner calls `tick()` on the
/// engine directly. Clones share counters, which lets tests check the
/// single-outstanding-callback rule after handing the schedule to an engine.
#[derive(Debug, Clone, Default)]
pub struct ManualSchedule {
    counts: Arc<Mutex<ScheduleCounts>>,
    last_period: Arc<Mutex<Option<Duration>>>,
}

impl ManualSchedule {
    pub fn counts(&self) -> ScheduleCounts {
        self.counts.lock().map(|c| *c).unwrap_or_default()
    }

    pub fn last_period(&self) -> Option<Duration> {
        self.last_period.lock().ok().and_then(|p| *p)
    }
}

impl Schedule for ManualSchedule {
    fn install(&mut self, period: Duration) {
        if let Ok(mut counts) = self.counts.lock() {
            counts.installs += 1;
            counts.outstanding += 1;
            counts.max_outstanding = counts.max_outstanding.max(counts.outstanding);
        }
        if let Ok(mut last) = self.last_period.lock() {
            *last = Some(period);
        }
    }

    fn cancel(&mut self) {
        if let Ok(mut counts) = self.counts.lock() {
            counts.cancels += 1;
            counts.outstanding = counts.outstanding.saturating_sub(1);
        }
    }

    fn is_active(&self) -> bool {
        self.counts().outstanding > 0
    }
}

/// Tokio-backed schedule. Each firing sends `()` on the channel returned by
/// [`IntervalSchedule::new`]; the receiver's owner then calls `tick()`.
///
/// `install` spawns a task, so it must run inside a tokio runtime.
pub struct IntervalSchedule {
    tx: mpsc::UnboundedSender<()>,
    handle: Option<JoinHandle<()>>,
}

impl IntervalSchedule {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, handle: None }, rx)
    }
}

impl Schedule for IntervalSchedule {
    fn install(&mut self, period: Duration) {
        self.cancel();

        let tx = self.tx.clone();
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // A suspended process should not wake up to a burst of ticks
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(()).is_err() {
                    break;
                }
            }
        }));
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for IntervalSchedule {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_schedule_counts() {
        let mut schedule = ManualSchedule::default();
        let observer = schedule.clone();

        schedule.cancel();
        schedule.install(Duration::from_millis(100));
        assert!(observer.is_active());
        schedule.cancel();
        assert!(!observer.is_active());

        let counts = observer.counts();
        assert_eq!(counts.installs, 1);
        assert_eq!(counts.cancels, 2);
        assert_eq!(counts.max_outstanding, 1);
        assert_eq!(observer.last_period(), Some(Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn test_interval_schedule_fires_until_cancelled() {
        let (mut schedule, mut rx) = IntervalSchedule::new();
        schedule.install(Duration::from_millis(10));
        assert!(schedule.is_active());

        let fired = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        assert_eq!(fired.unwrap(), Some(()));

        schedule.cancel();
        assert!(!schedule.is_active());

        // Drain anything sent before the abort landed, then expect silence
        tokio::time::sleep(Duration::from_millis(30)).await;
        while rx.try_recv().is_ok() {}
        let quiet = tokio::time::timeout(Duration::from_millis(60), rx.recv()).await;
        assert!(quiet.is_err());
    }

    #[tokio::test]
    async fn test_reinstall_replaces_previous_task() {
        let (mut schedule, _rx) = IntervalSchedule::new();
        schedule.install(Duration::from_millis(10));
        schedule.install(Duration::from_millis(10));
        assert!(schedule.is_active());
        schedule.cancel();
        assert!(!schedule.is_active());
    }
}
