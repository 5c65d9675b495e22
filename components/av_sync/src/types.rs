//! Synchronization types

use std::time::Duration;

/// Which clock drives playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MasterClock {
    /// Audio playback position (default when an audio stream exists)
    #[default]
    Audio = 0,
    /// Video display position
    Video = 1,
    /// Wall clock from play start (video-only files)
    External = 2,
}

impl MasterClock {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => MasterClock::Video,
            2 => MasterClock::External,
            _ => MasterClock::Audio,
        }
    }
}

/// Scheduling decision for one video frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    /// The frame is early; display after this wait
    Wait(Duration),
    /// The frame is on time; display now
    Display,
    /// The frame is too late; skip it
    Drop,
}

/// Scheduling thresholds in milliseconds
///
/// A frame more than `repeat_ms` early is delayed; a frame more than
/// `drop_ms` late is skipped; anything in between displays immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncThresholds {
    /// Early threshold (default 20 ms)
    pub repeat_ms: i64,
    /// Late threshold (default 100 ms)
    pub drop_ms: i64,
}

impl Default for SyncThresholds {
    fn default() -> Self {
        Self {
            repeat_ms: 20,
            drop_ms: 100,
        }
    }
}
