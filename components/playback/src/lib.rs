//! # playback Component
//!
//! The worker side of the pipeline: audio player, video player, and the
//! playback controller that owns the demux, decode, and seek threads.
//!
//! Backpressure has exactly one chain per stream: the player's frame
//! queue blocks its decode task, the full packet queue blocks the demux
//! task, and the demuxer then stops reading the transport. No worker
//! adds watermark checks or timed retries of its own on top of that.

mod audio_player;
mod controller;
mod types;
mod video_player;

pub use audio_player::AudioPlayer;
pub use controller::{AudioLane, PlaybackController, VideoLane};
pub use types::{PipelineConfig, PlaybackStats};
pub use video_player::VideoPlayer;
