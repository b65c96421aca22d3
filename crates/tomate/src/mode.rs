//! Timer modes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which countdown the timer is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TimerMode {
    /// Focus: the only mode that counts towards focus statistics
    #[default]
    #[serde(rename = "pomodoro")]
    Focus,
    #[serde(rename = "shortBreak")]
    ShortBreak,
    #[serde(rename = "longBreak")]
    LongBreak,
}

impl TimerMode {
    pub const ALL: [TimerMode; 3] = [TimerMode::Focus, TimerMode::ShortBreak, TimerMode::LongBreak];

    /// Persisted name (matches the `timerMode` key)
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Focus => "pomodoro",
            TimerMode::ShortBreak => "shortBreak",
            TimerMode::LongBreak => "longBreak",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Focus => "Pomodoro",
            TimerMode::ShortBreak => "Short Break",
            TimerMode::LongBreak => "Long Break",
        }
    }

    /// Notification body shown when a countdown in this mode completes
    pub fn completion_message(&self) -> &'static str {
        match self {
            TimerMode::Focus => "Great job! Take a break.",
            TimerMode::ShortBreak | TimerMode::LongBreak => "Break is over. Back to work!",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown timer mode: {0}")]
pub struct UnknownMode(pub String);

impl FromStr for TimerMode {
    type Err = UnknownMode;

    /// Accepts persisted names plus the short aliases used on the command line
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pomodoro" | "focus" | "work" => Ok(TimerMode::Focus),
            "shortbreak" | "short-break" | "short" => Ok(TimerMode::ShortBreak),
            "longbreak" | "long-break" | "long" => Ok(TimerMode::LongBreak),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persisted_names_parse_back() {
        for mode in TimerMode::ALL {
            assert_eq!(mode.as_str().parse::<TimerMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_cli_aliases() {
        assert_eq!("short".parse::<TimerMode>().unwrap(), TimerMode::ShortBreak);
        assert_eq!("Long-Break".parse::<TimerMode>().unwrap(), TimerMode::LongBreak);
        assert!("nap".parse::<TimerMode>().is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&TimerMode::ShortBreak).unwrap(), "\"shortBreak\"");
        let mode: TimerMode = serde_json::from_str("\"pomodoro\"").unwrap();
        assert_eq!(mode, TimerMode::Focus);
    }
}
