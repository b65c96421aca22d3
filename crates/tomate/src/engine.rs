//! Drift-corrected countdown engine
//!
//! While running, the engine holds an absolute target timestamp and derives
//! remaining time from it on every tick:
//!
//! ```text
//! remaining = max(0, ceil((target_ms - now_ms) / 1000))
//! ```
//!
//! Ticks come from a [`Schedule`] and carry no timing information of their
//! own, so delayed or bunched ticks cannot accumulate drift. Completion
//! fires once per session: `complete()` clears `running` before anything
//! else observes the engine, and `tick()` is a no-op when not running.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::clock::Clock;
use crate::events::{Completion, TimerObserver, TimerSnapshot};
use crate::mode::TimerMode;
use crate::ports::{NoopNotifier, NoopSound, Notifier, SoundCue, SoundPlayer};
use crate::schedule::{ManualSchedule, Schedule};
use crate::session::{SessionState, TimerRecord};
use crate::settings::TimerSettings;

/// Default recomputation period
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

const COMPLETE_TITLE: &str = "Timer Complete!";

pub struct TimerEngine {
    settings: TimerSettings,
    mode: TimerMode,
    duration_seconds: u64,
    remaining_seconds: u64,
    running: bool,
    /// Epoch milliseconds at which the countdown hits zero; set only while running
    target_ms: Option<i64>,
    completed_focus_sessions: u32,
    sound_enabled: bool,
    tick_interval: Duration,
    clock: Arc<dyn Clock>,
    schedule: Box<dyn Schedule>,
    notifier: Box<dyn Notifier>,
    sound: Box<dyn SoundPlayer>,
    observers: Vec<Box<dyn TimerObserver>>,
}

impl fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEngine")
            .field("mode", &self.mode)
            .field("remaining_seconds", &self.remaining_seconds)
            .field("duration_seconds", &self.duration_seconds)
            .field("running", &self.running)
            .field("target_ms", &self.target_ms)
            .finish_non_exhaustive()
    }
}

impl TimerEngine {
    /// A stopped Focus countdown at full duration, with no-op ports and a
    /// manual schedule
    pub fn new(settings: TimerSettings, clock: Arc<dyn Clock>) -> Self {
        let settings = settings.validated();
        let mode = TimerMode::Focus;
        let duration_seconds = settings.duration_seconds(mode);
        Self {
            settings,
            mode,
            duration_seconds,
            remaining_seconds: duration_seconds,
            running: false,
            target_ms: None,
            completed_focus_sessions: 0,
            sound_enabled: true,
            tick_interval: DEFAULT_TICK_INTERVAL,
            clock,
            schedule: Box::new(ManualSchedule::default()),
            notifier: Box::new(NoopNotifier),
            sound: Box::new(NoopSound),
            observers: Vec::new(),
        }
    }

    pub fn with_schedule(mut self, schedule: impl Schedule + 'static) -> Self {
        self.schedule.cancel();
        self.schedule = Box::new(schedule);
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_sound(mut self, sound: impl SoundPlayer + 'static) -> Self {
        self.sound = Box::new(sound);
        self
    }

    pub fn with_tick_interval(mut self, period: Duration) -> Self {
        self.tick_interval = period;
        self
    }

    pub fn subscribe(&mut self, observer: impl TimerObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn target_ms(&self) -> Option<i64> {
        self.target_ms
    }

    pub fn completed_focus_sessions(&self) -> u32 {
        self.completed_focus_sessions
    }

    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.sound_enabled = enabled;
        self.emit_state_change();
    }

    /// Fraction of the current countdown already elapsed, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.duration_seconds == 0 {
            return 1.0;
        }
        let left = self.remaining_seconds as f64 / self.duration_seconds as f64;
        (1.0 - left).clamp(0.0, 1.0)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            mode: self.mode,
            remaining_seconds: self.remaining_seconds,
            duration_seconds: self.duration_seconds,
            running: self.running,
            progress: self.progress(),
            completed_focus_sessions: self.completed_focus_sessions,
            sound_enabled: self.sound_enabled,
        }
    }

    /// Stop, change mode and refill to the new mode's full duration.
    /// Never completes and never records anything.
    pub fn switch_mode(&mut self, mode: TimerMode) {
        self.stop_countdown();
        self.mode = mode;
        self.refill();
        debug!(mode = %mode, "Switched mode");
        self.emit_state_change();
    }

    /// Begin counting down from the current remaining time
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        // A finished countdown starts over rather than completing again
        if self.remaining_seconds == 0 {
            self.refill();
        }

        self.begin_countdown();
        debug!(mode = %self.mode, remaining = self.remaining_seconds, "Started");
        self.play(SoundCue::Start);
        self.emit_state_change();
    }

    /// Stop counting down, keeping the last computed remaining time
    pub fn pause(&mut self) {
        if !self.running {
            return;
        }
        self.stop_countdown();
        debug!(mode = %self.mode, remaining = self.remaining_seconds, "Paused");
        self.play(SoundCue::Pause);
        self.emit_state_change();
    }

    /// Refill the current mode, optionally replacing the settings first. A
    /// running countdown restarts immediately from the new full duration.
    pub fn reset(&mut self, settings: Option<TimerSettings>) {
        let was_running = self.running;
        self.stop_countdown();

        if let Some(settings) = settings {
            self.settings = settings.validated();
        }
        self.refill();

        if was_running {
            self.begin_countdown();
        }
        debug!(mode = %self.mode, restarted = was_running, "Reset");
        self.emit_state_change();
    }

    /// Recompute remaining time from the target timestamp. Returns the
    /// completion when this tick finished the countdown.
    pub fn tick(&mut self) -> Option<Completion> {
        if !self.running {
            return None;
        }
        let target = self.target_ms?;

        let remaining = remaining_until(target, self.clock.now_ms());
        if remaining == 0 {
            return Some(self.complete());
        }

        if remaining != self.remaining_seconds {
            self.remaining_seconds = remaining;
            let snapshot = self.snapshot();
            for observer in &mut self.observers {
                observer.on_tick(&snapshot);
            }
        }
        None
    }

    /// Rebuild the session from persisted state. An active session resumes
    /// with a fresh target measured from now.
    pub fn restore(&mut self, record: &TimerRecord) {
        self.stop_countdown();
        self.settings = record.settings.validated();
        self.completed_focus_sessions = record.completed_pomodoros;
        self.sound_enabled = record.session.sound_enabled;
        self.mode = record.session.mode;
        self.duration_seconds = self.settings.duration_seconds(self.mode);
        self.remaining_seconds = record
            .session
            .seconds_left
            .map_or(self.duration_seconds, |s| s.min(self.duration_seconds));

        if record.session.is_active && self.remaining_seconds > 0 {
            self.begin_countdown();
        }
        debug!(mode = %self.mode, remaining = self.remaining_seconds, running = self.running, "Restored");
        self.emit_state_change();
    }

    /// State to persist so the session can be restored later
    pub fn record(&self) -> TimerRecord {
        TimerRecord {
            session: SessionState {
                seconds_left: Some(self.remaining_seconds),
                is_active: self.running,
                mode: self.mode,
                sound_enabled: self.sound_enabled,
            },
            settings: self.settings,
            completed_pomodoros: self.completed_focus_sessions,
        }
    }

    fn complete(&mut self) -> Completion {
        self.stop_countdown();
        self.remaining_seconds = 0;

        let focus_minutes = (self.mode == TimerMode::Focus).then_some(self.settings.pomodoro);
        if focus_minutes.is_some() {
            self.completed_focus_sessions = self.completed_focus_sessions.saturating_add(1);
        }
        let completion = Completion {
            mode: self.mode,
            focus_minutes,
        };
        info!(mode = %self.mode, ?focus_minutes, "Countdown complete");

        self.play(SoundCue::Complete);
        if let Err(e) = self
            .notifier
            .notify(COMPLETE_TITLE, self.mode.completion_message())
        {
            debug!(error = %e, "Notification failed");
        }

        for observer in &mut self.observers {
            observer.on_complete(&completion);
        }
        self.emit_state_change();
        completion
    }

    fn refill(&mut self) {
        self.duration_seconds = self.settings.duration_seconds(self.mode);
        self.remaining_seconds = self.duration_seconds;
    }

    /// Set the target from the current remaining time and install a fresh schedule
    fn begin_countdown(&mut self) {
        self.running = true;
        self.target_ms = Some(self.clock.now_ms() + self.remaining_seconds as i64 * 1000);
        self.schedule.cancel();
        self.schedule.install(self.tick_interval);
    }

    fn stop_countdown(&mut self) {
        self.schedule.cancel();
        self.running = false;
        self.target_ms = None;
    }

    fn play(&self, cue: SoundCue) {
        if !self.sound_enabled {
            return;
        }
        if let Err(e) = self.sound.play(cue) {
            debug!(?cue, error = %e, "Sound cue failed");
        }
    }

    fn emit_state_change(&mut self) {
        let snapshot = self.snapshot();
        for observer in &mut self.observers {
            observer.on_state_change(&snapshot);
        }
    }
}

/// Whole seconds until `target_ms`, rounded up, never negative
pub fn remaining_until(target_ms: i64, now_ms: i64) -> u64 {
    let delta = target_ms.saturating_sub(now_ms);
    if delta <= 0 {
        0
    } else {
        (delta as u64).div_ceil(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::testing::{EventLog, Recorded};
    use crate::ports::testing::RecordingPorts;

    struct Harness {
        engine: TimerEngine,
        clock: ManualClock,
        schedule: ManualSchedule,
        log: EventLog,
        ports: RecordingPorts,
    }

    fn harness_with(settings: TimerSettings, ports: RecordingPorts) -> Harness {
        let clock = ManualClock::new(1_700_000_000_000);
        let schedule = ManualSchedule::default();
        let log = EventLog::default();
        let mut engine = TimerEngine::new(settings, Arc::new(clock.clone()))
            .with_schedule(schedule.clone())
            .with_notifier(ports.clone())
            .with_sound(ports.clone());
        engine.subscribe(log.clone());
        Harness {
            engine,
            clock,
            schedule,
            log,
            ports,
        }
    }

    fn harness() -> Harness {
        harness_with(TimerSettings::default(), RecordingPorts::default())
    }

    #[test]
    fn test_remaining_until_rounds_up() {
        assert_eq!(remaining_until(10_000, 0), 10);
        assert_eq!(remaining_until(10_000, 1), 10);
        assert_eq!(remaining_until(10_000, 999), 10);
        assert_eq!(remaining_until(10_000, 1_000), 9);
        assert_eq!(remaining_until(10_000, 9_999), 1);
        assert_eq!(remaining_until(10_000, 10_000), 0);
        assert_eq!(remaining_until(10_000, 50_000), 0);
    }

    #[test]
    fn test_new_engine_is_idle_at_full_duration() {
        let h = harness();
        assert_eq!(h.engine.mode(), TimerMode::Focus);
        assert_eq!(h.engine.remaining_seconds(), 1500);
        assert!(!h.engine.is_running());
        assert_eq!(h.engine.target_ms(), None);
        assert_eq!(h.engine.progress(), 0.0);
    }

    #[test]
    fn test_start_sets_absolute_target() {
        let mut h = harness();
        let now = h.clock.now_ms();
        h.engine.start();

        assert!(h.engine.is_running());
        assert_eq!(h.engine.target_ms(), Some(now + 1_500_000));
        assert!(h.schedule.is_active());
        assert_eq!(h.schedule.last_period(), Some(DEFAULT_TICK_INTERVAL));
        assert_eq!(h.ports.cues(), vec![SoundCue::Start]);
    }

    #[test]
    fn test_start_twice_is_noop() {
        let mut h = harness();
        h.engine.start();
        let target = h.engine.target_ms();
        h.clock.advance_secs(5);
        h.engine.start();

        assert_eq!(h.engine.target_ms(), target);
        assert_eq!(h.schedule.counts().installs, 1);
        assert_eq!(h.ports.cues(), vec![SoundCue::Start]);
    }

    #[test]
    fn test_irregular_ticks_track_wall_clock() {
        let mut h = harness_with(
            TimerSettings {
                pomodoro: 1,
                short_break: 5,
                long_break: 15,
            },
            RecordingPorts::default(),
        );
        h.engine.start();
        let target = h.engine.target_ms().unwrap();

        let mut previous = h.engine.remaining_seconds();
        for step in [100, 250, 1_700, 30, 4_000, 12_345, 999, 1, 20_000, 7_500] {
            h.clock.advance_ms(step);
            let completion = h.engine.tick();
            let expected = remaining_until(target, h.clock.now_ms());
            if expected == 0 {
                assert!(completion.is_some());
                break;
            }
            assert_eq!(h.engine.remaining_seconds(), expected);
            assert!(h.engine.remaining_seconds() <= previous);
            previous = h.engine.remaining_seconds();
        }

        // A single late tick lands on the same answer as many small ones
        h.clock.advance_secs(60);
        h.engine.tick();
        assert_eq!(h.engine.remaining_seconds(), 0);
        assert_eq!(h.log.completions(), 1);
    }

    #[test]
    fn test_tick_only_notifies_on_change() {
        let mut h = harness();
        h.engine.start();

        for _ in 0..9 {
            h.clock.advance_ms(100);
            h.engine.tick();
        }
        assert!(h.log.ticks().is_empty());

        h.clock.advance_ms(100);
        h.engine.tick();
        assert_eq!(h.log.ticks(), vec![1499]);
    }

    #[test]
    fn test_completion_fires_exactly_once() {
        let mut h = harness();
        h.engine.start();
        h.clock.advance_secs(1500);

        let first = h.engine.tick();
        assert_eq!(
            first,
            Some(Completion {
                mode: TimerMode::Focus,
                focus_minutes: Some(25),
            })
        );
        for _ in 0..10 {
            h.clock.advance_ms(100);
            assert_eq!(h.engine.tick(), None);
        }

        assert_eq!(h.log.completions(), 1);
        assert_eq!(h.engine.remaining_seconds(), 0);
        assert!(!h.engine.is_running());
        assert!(!h.schedule.is_active());
        assert_eq!(h.engine.completed_focus_sessions(), 1);
        assert_eq!(h.engine.progress(), 1.0);
        assert_eq!(h.ports.cues(), vec![SoundCue::Start, SoundCue::Complete]);
        assert_eq!(
            h.ports.notes(),
            vec![(
                "Timer Complete!".to_string(),
                "Great job! Take a break.".to_string()
            )]
        );
    }

    #[test]
    fn test_break_completion_has_no_focus_minutes() {
        let mut h = harness();
        h.engine.switch_mode(TimerMode::ShortBreak);
        h.engine.start();
        h.clock.advance_secs(301);

        let completion = h.engine.tick().unwrap();
        assert_eq!(completion.focus_minutes, None);
        assert_eq!(h.engine.completed_focus_sessions(), 0);
        assert_eq!(h.ports.notes()[0].1, "Break is over. Back to work!");
    }

    #[test]
    fn test_restart_after_completion_refills() {
        let mut h = harness();
        h.engine.start();
        h.clock.advance_secs(1500);
        h.engine.tick();

        h.engine.start();
        assert_eq!(h.engine.remaining_seconds(), 1500);
        h.clock.advance_ms(100);
        assert_eq!(h.engine.tick(), None);
        assert_eq!(h.log.completions(), 1);
    }

    #[test]
    fn test_pause_preserves_remaining_and_resume_continues() {
        let mut h = harness();
        h.engine.start();
        h.clock.advance_secs(100);
        h.engine.tick();
        h.engine.pause();

        assert!(!h.engine.is_running());
        assert_eq!(h.engine.target_ms(), None);
        assert_eq!(h.engine.remaining_seconds(), 1400);
        assert!(!h.schedule.is_active());

        // Time passing while paused does not count
        h.clock.advance_secs(600);
        assert_eq!(h.engine.tick(), None);
        assert_eq!(h.engine.remaining_seconds(), 1400);

        h.engine.start();
        assert_eq!(h.engine.target_ms(), Some(h.clock.now_ms() + 1_400_000));
        h.clock.advance_secs(1400);
        assert!(h.engine.tick().is_some());
        assert_eq!(
            h.ports.cues(),
            vec![
                SoundCue::Start,
                SoundCue::Pause,
                SoundCue::Start,
                SoundCue::Complete
            ]
        );
    }

    #[test]
    fn test_pause_when_idle_is_noop() {
        let mut h = harness();
        h.engine.pause();
        assert!(h.ports.cues().is_empty());
        assert!(h.log.events().is_empty());
    }

    #[test]
    fn test_switch_mode_while_running_resets_without_completion() {
        let mut h = harness();
        h.engine.start();
        h.clock.advance_secs(1000);
        h.engine.tick();

        h.engine.switch_mode(TimerMode::LongBreak);
        assert!(!h.engine.is_running());
        assert_eq!(h.engine.remaining_seconds(), 900);
        assert_eq!(h.engine.target_ms(), None);
        assert!(!h.schedule.is_active());

        h.clock.advance_secs(5000);
        assert_eq!(h.engine.tick(), None);
        assert_eq!(h.log.completions(), 0);
        assert_eq!(h.engine.completed_focus_sessions(), 0);
    }

    #[test]
    fn test_reset_with_new_settings_restarts_running_session() {
        let mut h = harness();
        h.engine.start();
        h.clock.advance_secs(300);
        h.engine.tick();

        h.engine.reset(Some(TimerSettings {
            pomodoro: 999,
            short_break: 5,
            long_break: 15,
        }));
        assert!(h.engine.is_running());
        assert_eq!(h.engine.settings().pomodoro, 120);
        assert_eq!(h.engine.remaining_seconds(), 7200);
        assert_eq!(h.engine.target_ms(), Some(h.clock.now_ms() + 7_200_000));
        assert_eq!(h.schedule.counts().outstanding, 1);
        // Restarting is not a user "start"
        assert_eq!(h.ports.cues(), vec![SoundCue::Start]);
    }

    #[test]
    fn test_reset_while_idle_stays_idle() {
        let mut h = harness();
        h.engine.switch_mode(TimerMode::ShortBreak);
        h.engine.reset(None);
        assert!(!h.engine.is_running());
        assert_eq!(h.engine.remaining_seconds(), 300);
        assert!(!h.schedule.is_active());
    }

    #[test]
    fn test_at_most_one_schedule_outstanding() {
        let mut h = harness();
        h.engine.start();
        h.engine.reset(None);
        h.engine.reset(None);
        h.engine.pause();
        h.engine.start();
        h.engine.switch_mode(TimerMode::ShortBreak);
        h.engine.start();
        h.engine.reset(Some(TimerSettings::default()));
        h.clock.advance_secs(300);
        h.engine.tick();
        h.engine.start();

        let counts = h.schedule.counts();
        assert_eq!(counts.max_outstanding, 1);
        assert_eq!(counts.outstanding, 1);
    }

    #[test]
    fn test_progress_tracks_remaining() {
        let mut h = harness();
        h.engine.start();
        h.clock.advance_secs(750);
        h.engine.tick();
        assert!((h.engine.progress() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_port_failures_are_swallowed() {
        let mut h = harness_with(TimerSettings::default(), RecordingPorts::failing());
        h.engine.start();
        h.clock.advance_secs(1500);
        assert!(h.engine.tick().is_some());
        assert_eq!(h.ports.notes().len(), 1);
    }

    #[test]
    fn test_sound_disabled_plays_nothing() {
        let mut h = harness();
        h.engine.set_sound_enabled(false);
        h.engine.start();
        h.engine.pause();
        assert!(h.ports.cues().is_empty());
    }

    #[test]
    fn test_observers_see_state_changes() {
        let mut h = harness();
        h.engine.start();
        h.engine.pause();
        assert_eq!(
            h.log.events(),
            vec![
                Recorded::State {
                    running: true,
                    remaining: 1500
                },
                Recorded::State {
                    running: false,
                    remaining: 1500
                },
            ]
        );
    }

    #[test]
    fn test_restore_active_session_resumes_from_now() {
        let mut h = harness();
        let record = TimerRecord {
            session: SessionState {
                seconds_left: Some(420),
                is_active: true,
                mode: TimerMode::ShortBreak,
                sound_enabled: false,
            },
            settings: TimerSettings {
                pomodoro: 30,
                short_break: 10,
                long_break: 20,
            },
            completed_pomodoros: 4,
        };

        h.engine.restore(&record);
        assert!(h.engine.is_running());
        assert_eq!(h.engine.mode(), TimerMode::ShortBreak);
        assert_eq!(h.engine.remaining_seconds(), 420);
        assert_eq!(h.engine.target_ms(), Some(h.clock.now_ms() + 420_000));
        assert_eq!(h.engine.completed_focus_sessions(), 4);
        assert!(!h.engine.sound_enabled());
        assert_eq!(h.engine.record(), record);
    }

    #[test]
    fn test_restore_clamps_to_duration_and_skips_finished() {
        let mut h = harness();
        let mut record = h.engine.record();
        record.session.seconds_left = Some(99_999);
        h.engine.restore(&record);
        assert_eq!(h.engine.remaining_seconds(), 1500);

        record.session.seconds_left = Some(0);
        record.session.is_active = true;
        h.engine.restore(&record);
        assert!(!h.engine.is_running());
        assert_eq!(h.log.completions(), 0);
    }
}
