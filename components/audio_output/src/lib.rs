//! # audio_output Component
//!
//! Platform audio endpoint for the playback pipeline.
//!
//! The OS audio thread drives a fill callback asking the player for PCM;
//! the player either supplies real data or silence. The device is held
//! from open to close of one file and paused through the platform's own
//! pause operation.
//!
//! The cpal stream object is confined to a dedicated device-owner thread
//! because stream handles are not movable across threads on every
//! platform; control operations are forwarded as commands.

mod cpal_output;
mod output;

pub use cpal_output::CpalOutput;
pub use output::{AudioOutput, AudioSink};
