//! Pipeline configuration and statistics

/// Queue sizing and policy knobs
///
/// The frame-queue depths together with the device buffer must cover the
/// worst-case decoder stall; the defaults (≈3 s of audio frames ahead of
/// a ≈1 s device buffer) are stable across the targeted formats. Halving
/// them causes startup sync drift without additional prefill logic.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Video frame queue depth
    pub video_frame_capacity: usize,
    /// Audio frame queue depth
    pub audio_frame_capacity: usize,
    /// Video packet queue depth
    pub video_packet_capacity: usize,
    /// Audio packet queue depth
    pub audio_packet_capacity: usize,
    /// Video frame queue occupancy (percent) above which producers block
    pub video_watermark_percent: usize,
    /// Consecutive decoder errors tolerated before the Error state
    pub max_transient_decode_errors: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            video_frame_capacity: 30,
            audio_frame_capacity: 150,
            video_packet_capacity: 100,
            audio_packet_capacity: 200,
            video_watermark_percent: 75,
            max_transient_decode_errors: 10,
        }
    }
}

impl PipelineConfig {
    /// Absolute video-queue occupancy above which producers block
    pub fn video_watermark(&self) -> usize {
        (self.video_frame_capacity * self.video_watermark_percent / 100).max(1)
    }
}

/// Counters published by the pipeline
///
/// Mirrored into the metrics sink as they change; this snapshot form is
/// what the facade hands to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Packets read from the container
    pub packets_demuxed: u64,
    /// Video frames handed to the renderer
    pub frames_rendered: u64,
    /// Video frames skipped for being late
    pub frames_dropped: u64,
    /// Device callbacks that ran out of audio
    pub audio_underruns: u64,
    /// Seeks executed by the seek worker
    pub seeks_performed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_watermark() {
        let config = PipelineConfig::default();
        assert_eq!(config.video_watermark(), 22);
    }

    #[test]
    fn test_watermark_never_zero() {
        let config = PipelineConfig {
            video_frame_capacity: 1,
            video_watermark_percent: 10,
            ..Default::default()
        };
        assert_eq!(config.video_watermark(), 1);
    }
}
