//! Host-backed notifier and sound player

use anyhow::{bail, Result};
use std::io::Write;
use std::process::Command;

use crate::ports::{Notifier, SoundCue, SoundPlayer};

/// Available notification backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Linux notify-send
    NotifySend,
    /// macOS osascript
    Osascript,
    /// Print to stdout
    Echo,
}

impl Backend {
    /// Best available backend for the current platform
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            return Self::Osascript;
        }
        if cfg!(target_os = "linux") && command_exists("notify-send") {
            return Self::NotifySend;
        }
        Self::Echo
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::NotifySend => "notify-send",
            Self::Osascript => "osascript",
            Self::Echo => "echo",
        }
    }

    fn send(&self, title: &str, body: &str) -> Result<()> {
        match self {
            Self::NotifySend => {
                let status = Command::new("notify-send")
                    .args(["--app-name", "tomate", title, body])
                    .status()?;
                if !status.success() {
                    bail!("notify-send failed with status: {}", status);
                }
            }
            Self::Osascript => {
                let script = format!(
                    r#"display notification "{}" with title "{}""#,
                    escape_applescript(body),
                    escape_applescript(title)
                );
                let status = Command::new("osascript").args(["-e", &script]).status()?;
                if !status.success() {
                    bail!("osascript failed with status: {}", status);
                }
            }
            Self::Echo => println!("\n[{}] {}", title, body),
        }
        Ok(())
    }
}

fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn escape_applescript(s: &str) -> String {
    s.replace('\\', r"\\").replace('"', r#"\""#)
}

/// Desktop notifications through whatever the host offers
#[derive(Debug, Clone, Copy)]
pub struct DesktopNotifier {
    backend: Backend,
}

impl DesktopNotifier {
    pub fn detect() -> Self {
        Self {
            backend: Backend::detect(),
        }
    }

    pub fn with_backend(backend: Backend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        self.backend.send(title, body)
    }
}

/// Rings the terminal bell: once for start and pause, twice on completion
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalBell;

impl SoundPlayer for TerminalBell {
    fn play(&self, cue: SoundCue) -> Result<()> {
        let bells = match cue {
            SoundCue::Start | SoundCue::Pause => "\x07",
            SoundCue::Complete => "\x07\x07",
        };
        let mut err = std::io::stderr().lock();
        err.write_all(bells.as_bytes())?;
        err.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_applescript() {
        assert_eq!(escape_applescript(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_applescript(r"a\b"), r"a\\b");
    }

    #[test]
    fn test_echo_backend_always_succeeds() {
        let notifier = DesktopNotifier::with_backend(Backend::Echo);
        assert_eq!(notifier.backend().name(), "echo");
        assert!(notifier.notify("Timer Complete!", "Great job! Take a break.").is_ok());
    }
}
