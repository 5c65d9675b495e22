//! # av_sync Component
//!
//! Audio/video synchronization controller.
//!
//! Maintains one clock per source (audio, video, external), normalizes
//! PTS values against per-stream bases, extrapolates the master clock
//! between updates, and decides for every video frame whether to wait,
//! display, or drop.
//!
//! Pause is implemented by shifting every clock's reference time forward
//! by the pause length on resume, so the extrapolation hot path never
//! compensates for pauses.

mod clock;
mod controller;
mod types;

pub use controller::SyncController;
pub use types::{FrameAction, MasterClock, SyncThresholds};
