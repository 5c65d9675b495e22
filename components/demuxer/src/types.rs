//! Stream and media information types

use zenplay_shared_types::TimeBase;

/// Video track information
#[derive(Debug, Clone)]
pub struct VideoTrackInfo {
    /// Stream index inside the container
    pub index: usize,
    /// Codec name as reported by the library (e.g. "h264")
    pub codec_name: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Stream time base
    pub time_base: TimeBase,
    /// Average frame rate, when the container declares one
    pub frame_rate: Option<f64>,
}

/// Audio track information
#[derive(Debug, Clone)]
pub struct AudioTrackInfo {
    /// Stream index inside the container
    pub index: usize,
    /// Codec name as reported by the library (e.g. "aac")
    pub codec_name: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
    /// Stream time base
    pub time_base: TimeBase,
}

/// Information about an opened source
#[derive(Debug, Clone, Default)]
pub struct MediaInfo {
    /// Total duration in milliseconds; 0 when unknown (live streams)
    pub duration_ms: i64,
    /// The selected video track, if any
    pub video: Option<VideoTrackInfo>,
    /// The selected audio track, if any
    pub audio: Option<AudioTrackInfo>,
}

impl MediaInfo {
    /// True when the source carries no video stream
    pub fn is_audio_only(&self) -> bool {
        self.video.is_none() && self.audio.is_some()
    }

    /// True when the source carries no audio stream
    pub fn is_video_only(&self) -> bool {
        self.audio.is_none() && self.video.is_some()
    }
}
