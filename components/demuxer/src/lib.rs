//! # demuxer Component
//!
//! Container demuxing for the playback pipeline.
//!
//! Wraps the codec library's format context: opens a URL with a
//! protocol-aware option set, enumerates the best audio/video streams,
//! pulls packets in container order, and repositions to keyframes on
//! seek. Seeking here does not flush downstream state; that is the
//! playback controller's job.

mod demuxer;
mod error;
mod options;
mod types;

pub use demuxer::{DemuxEvent, Demuxer};
pub use error::{DemuxError, DemuxResult};
pub use options::protocol_options;
pub use types::{AudioTrackInfo, MediaInfo, VideoTrackInfo};

use std::sync::Once;

static FFMPEG_INIT: Once = Once::new();

/// Initializes the codec library once per process
pub fn ensure_codec_init() {
    FFMPEG_INIT.call_once(|| {
        if let Err(error) = ffmpeg_next::init() {
            tracing::error!(%error, "codec library initialization failed");
        }
    });
}
