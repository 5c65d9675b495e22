//! Seek request types

use crate::state::PlayerState;

/// Direction hint for a seek
///
/// Backward asks the demuxer for the nearest keyframe at or before the
/// target, which is what a progress-slider jump wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeekDirection {
    /// Land on the nearest keyframe ≤ target
    #[default]
    Backward,
    /// Land on the nearest keyframe ≥ target
    Forward,
}

/// An asynchronous seek request
///
/// Queued by the facade and consumed by the seek worker; rapid requests
/// are coalesced to the newest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekRequest {
    /// Target position in milliseconds of absolute media time
    pub target_ms: i64,
    /// Direction hint
    pub direction: SeekDirection,
    /// State to restore once the seek completes (Playing or Paused)
    pub resume_state: PlayerState,
}

impl SeekRequest {
    /// Creates a backward seek request
    pub fn new(target_ms: i64, resume_state: PlayerState) -> Self {
        Self {
            target_ms,
            direction: SeekDirection::Backward,
            resume_state,
        }
    }
}
