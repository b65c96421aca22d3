//! Timer session persistence
//!
//! Lets a countdown survive a process restart. The session is stored as
//! plain strings under `secondsLeft`, `timerIsActive`, `timerMode` and
//! `soundEnabled`; settings and the completed-pomodoro total live under
//! their own keys. Unreadable values fall back to defaults.

use serde_json::Value;
use tracing::warn;

use crate::mode::TimerMode;
use crate::settings::TimerSettings;
use crate::storage::{get_json, keys, to_json, StatsStore, StoreError};

/// Persisted view of the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    /// `None` means "full duration of `mode`"
    pub seconds_left: Option<u64>,
    pub is_active: bool,
    pub mode: TimerMode,
    pub sound_enabled: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            seconds_left: None,
            is_active: false,
            mode: TimerMode::Focus,
            sound_enabled: true,
        }
    }
}

/// Everything written when the timer is saved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRecord {
    pub session: SessionState,
    pub settings: TimerSettings,
    pub completed_pomodoros: u32,
}

fn read<S: StatsStore + ?Sized>(store: &S, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Failed to read timer state");
            None
        }
    }
}

pub fn load_session<S: StatsStore + ?Sized>(store: &S) -> SessionState {
    let defaults = SessionState::default();

    let seconds_left = read(store, keys::SECONDS_LEFT).and_then(|v| v.trim().parse::<u64>().ok());
    let is_active = read(store, keys::TIMER_IS_ACTIVE).is_some_and(|v| v.trim() == "true");
    let mode = read(store, keys::TIMER_MODE)
        .and_then(|v| v.parse::<TimerMode>().ok())
        .unwrap_or(defaults.mode);
    // Sound stays on unless explicitly turned off
    let sound_enabled = match read(store, keys::SOUND_ENABLED) {
        Some(v) => v.trim() != "false",
        None => defaults.sound_enabled,
    };

    SessionState {
        seconds_left,
        is_active,
        mode,
        sound_enabled,
    }
}

pub fn load_settings<S: StatsStore + ?Sized>(store: &S) -> TimerSettings {
    match get_json::<Value, S>(store, keys::TIMER_SETTINGS) {
        Ok(Some(value)) => TimerSettings::from_value(&value),
        Ok(None) => TimerSettings::default(),
        Err(e) => {
            warn!(error = %e, "Unreadable timer settings, using defaults");
            TimerSettings::default()
        }
    }
}

pub fn load_completed_pomodoros<S: StatsStore + ?Sized>(store: &S) -> u32 {
    read(store, keys::COMPLETED_POMODOROS)
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(0)
}

pub fn load_record<S: StatsStore + ?Sized>(store: &S) -> TimerRecord {
    TimerRecord {
        session: load_session(store),
        settings: load_settings(store),
        completed_pomodoros: load_completed_pomodoros(store),
    }
}

/// Write the whole record in one store call
pub fn save_record<S: StatsStore + ?Sized>(store: &mut S, record: &TimerRecord) -> Result<(), StoreError> {
    let session = &record.session;
    let mut entries = vec![
        (keys::TIMER_IS_ACTIVE, session.is_active.to_string()),
        (keys::TIMER_MODE, session.mode.as_str().to_string()),
        (keys::SOUND_ENABLED, session.sound_enabled.to_string()),
        (keys::TIMER_SETTINGS, to_json(keys::TIMER_SETTINGS, &record.settings)?),
        (keys::COMPLETED_POMODOROS, record.completed_pomodoros.to_string()),
    ];
    if let Some(seconds) = session.seconds_left {
        entries.push((keys::SECONDS_LEFT, seconds.to_string()));
    }
    store.set_many(&entries)
}
