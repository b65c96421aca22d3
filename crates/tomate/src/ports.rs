//! Optional host capabilities
//!
//! Sound cues and desktop notifications are best-effort. The engine calls
//! them, logs failures at debug level and carries on.

use anyhow::Result;

/// Which cue to play
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Start,
    Pause,
    Complete,
}

/// Something that can show a user-facing notification
pub trait Notifier {
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Something that can play a short audio cue
pub trait SoundPlayer {
    fn play(&self, cue: SoundCue) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _title: &str, _body: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSound;

impl SoundPlayer for NoopSound {
    fn play(&self, _cue: SoundCue) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use anyhow::bail;
    use std::sync::{Arc, Mutex};

    /// Records cues and notifications; optionally fails every call
    #[derive(Clone, Default)]
    pub struct RecordingPorts {
        pub cues: Arc<Mutex<Vec<SoundCue>>>,
        pub notes: Arc<Mutex<Vec<(String, String)>>>,
        pub fail: bool,
    }

    impl RecordingPorts {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn cues(&self) -> Vec<SoundCue> {
            self.cues.lock().unwrap().clone()
        }

        pub fn notes(&self) -> Vec<(String, String)> {
            self.notes.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingPorts {
        fn notify(&self, title: &str, body: &str) -> Result<()> {
            self.notes
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
            if self.fail {
                bail!("notification backend unavailable");
            }
            Ok(())
        }
    }

    impl SoundPlayer for RecordingPorts {
        fn play(&self, cue: SoundCue) -> Result<()> {
            self.cues.lock().unwrap().push(cue);
            if self.fail {
                bail!("no audio device");
            }
            Ok(())
        }
    }
}
