//! Per-mode timer durations
//!
//! Minute values arrive as free text from the command line or as loosely
//! typed JSON from the store. Both paths go through the same rules: read the
//! leading integer, treat missing or zero as "use the default", and clamp to
//! `[MIN_MINUTES, MAX_MINUTES]`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mode::TimerMode;

pub const MIN_MINUTES: u32 = 1;
pub const MAX_MINUTES: u32 = 120;

pub const DEFAULT_POMODORO: u32 = 25;
pub const DEFAULT_SHORT_BREAK: u32 = 5;
pub const DEFAULT_LONG_BREAK: u32 = 15;

/// Validated minute values for each mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    pub pomodoro: u32,
    pub short_break: u32,
    pub long_break: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            pomodoro: DEFAULT_POMODORO,
            short_break: DEFAULT_SHORT_BREAK,
            long_break: DEFAULT_LONG_BREAK,
        }
    }
}

impl TimerSettings {
    /// Build settings from raw text input
    pub fn from_input(pomodoro: &str, short_break: &str, long_break: &str) -> Self {
        Self {
            pomodoro: parse_minutes(pomodoro, DEFAULT_POMODORO),
            short_break: parse_minutes(short_break, DEFAULT_SHORT_BREAK),
            long_break: parse_minutes(long_break, DEFAULT_LONG_BREAK),
        }
    }

    /// Build settings from a persisted JSON object whose values may be
    /// numbers or strings
    pub fn from_value(value: &Value) -> Self {
        Self {
            pomodoro: minutes_from_value(value.get("pomodoro"), DEFAULT_POMODORO),
            short_break: minutes_from_value(value.get("shortBreak"), DEFAULT_SHORT_BREAK),
            long_break: minutes_from_value(value.get("longBreak"), DEFAULT_LONG_BREAK),
        }
    }

    /// Re-apply the clamp rules to already-numeric values
    pub fn validated(self) -> Self {
        Self {
            pomodoro: clamp_minutes(self.pomodoro as i64, DEFAULT_POMODORO),
            short_break: clamp_minutes(self.short_break as i64, DEFAULT_SHORT_BREAK),
            long_break: clamp_minutes(self.long_break as i64, DEFAULT_LONG_BREAK),
        }
    }

    pub fn minutes(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Focus => self.pomodoro,
            TimerMode::ShortBreak => self.short_break,
            TimerMode::LongBreak => self.long_break,
        }
    }

    pub fn duration_seconds(&self, mode: TimerMode) -> u64 {
        self.minutes(mode) as u64 * 60
    }
}

/// Parse a minute value from text, falling back to `default` when no
/// leading integer is present or the value is zero
pub fn parse_minutes(input: &str, default: u32) -> u32 {
    match leading_integer(input) {
        Some(value) => clamp_minutes(value, default),
        None => default,
    }
}

fn minutes_from_value(value: Option<&Value>, default: u32) -> u32 {
    match value {
        Some(Value::Number(n)) => match n.as_i64() {
            Some(v) => clamp_minutes(v, default),
            // Fractional values keep their integer part
            None => n
                .as_f64()
                .filter(|f| f.is_finite())
                .map(|f| clamp_minutes(f.trunc() as i64, default))
                .unwrap_or(default),
        },
        Some(Value::String(s)) => parse_minutes(s, default),
        _ => default,
    }
}

fn clamp_minutes(value: i64, default: u32) -> u32 {
    if value == 0 {
        return default;
    }
    value.clamp(MIN_MINUTES as i64, MAX_MINUTES as i64) as u32
}

/// Optional sign followed by at least one digit, after leading whitespace.
/// Trailing characters are ignored ("12min" reads as 12).
fn leading_integer(input: &str) -> Option<i64> {
    let s = input.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }

    // Anything too long for i64 is far outside the clamp range anyway
    let magnitude = rest[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
