//! Synchronization controller

use crate::clock::StreamClock;
use crate::types::{FrameAction, MasterClock, SyncThresholds};
use metrics::gauge;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Capacity of the observed-offset ring kept for statistics.
const OFFSET_RING_CAPACITY: usize = 64;

struct Inner {
    audio: StreamClock,
    video: StreamClock,
    /// Reference instant of the external clock; adjusted by seek so the
    /// external path reports the seek target immediately.
    play_start: Option<Instant>,
    pause_start: Option<Instant>,
    offsets: VecDeque<f64>,
}

/// Master-clock controller shared by the audio and video players
///
/// The audio player reports submitted-sample positions, the video player
/// reports displayed-frame positions, and both sides query the master
/// clock through this controller. Extrapolation between reports is the
/// controller's sole responsibility; callers never maintain a second
/// time basis.
///
/// # Examples
///
/// ```
/// use std::time::Instant;
/// use zenplay_av_sync::{MasterClock, SyncController, SyncThresholds};
///
/// let sync = SyncController::new(MasterClock::Audio, SyncThresholds::default());
/// let now = Instant::now();
/// sync.update_audio_clock(0.0, now);
/// assert!(sync.master_clock_ms(now).abs() < 1.0);
/// ```
pub struct SyncController {
    inner: Mutex<Inner>,
    master: AtomicU8,
    thresholds: SyncThresholds,
}

impl SyncController {
    /// Creates a controller with the given master mode and thresholds
    pub fn new(master: MasterClock, thresholds: SyncThresholds) -> Self {
        Self {
            inner: Mutex::new(Inner {
                audio: StreamClock::default(),
                video: StreamClock::default(),
                play_start: None,
                pause_start: None,
                offsets: VecDeque::with_capacity(OFFSET_RING_CAPACITY),
            }),
            master: AtomicU8::new(master as u8),
            thresholds,
        }
    }

    /// The active master-clock source
    pub fn master(&self) -> MasterClock {
        MasterClock::from_u8(self.master.load(Ordering::Acquire))
    }

    /// Switches the master-clock source
    pub fn set_master(&self, master: MasterClock) {
        self.master.store(master as u8, Ordering::Release);
        debug!(master = ?master, "master clock selected");
    }

    /// Anchors the external clock at the moment playback starts
    ///
    /// Only the first call after open (or after a seek reset) takes
    /// effect.
    pub fn mark_play_start(&self, now: Instant) {
        let mut inner = self.inner.lock();
        if inner.play_start.is_none() {
            inner.play_start = Some(now);
        }
    }

    /// Records the audio position in stream milliseconds
    ///
    /// The first call fixes the audio normalization base for the life of
    /// the open file.
    pub fn update_audio_clock(&self, raw_pts_ms: f64, now: Instant) {
        let mut inner = self.inner.lock();
        let running = inner.pause_start.is_none();
        inner.audio.update(raw_pts_ms, now, running);
    }

    /// Records the video position in stream milliseconds
    pub fn update_video_clock(&self, raw_pts_ms: f64, now: Instant) {
        let mut inner = self.inner.lock();
        let running = inner.pause_start.is_none();
        inner.video.update(raw_pts_ms, now, running);
    }

    /// Current master-clock value in normalized milliseconds
    ///
    /// While paused this returns the frozen value at the pause instant.
    pub fn master_clock_ms(&self, now: Instant) -> f64 {
        let inner = self.inner.lock();
        Self::master_clock_locked(&inner, self.master(), now)
    }

    fn master_clock_locked(inner: &Inner, master: MasterClock, now: Instant) -> f64 {
        let eval_at = inner.pause_start.unwrap_or(now);
        match master {
            MasterClock::Audio => inner.audio.extrapolate(eval_at),
            MasterClock::Video => inner.video.extrapolate(eval_at),
            MasterClock::External => match inner.play_start {
                Some(play_start) if eval_at >= play_start => {
                    eval_at.duration_since(play_start).as_secs_f64() * 1000.0
                }
                _ => 0.0,
            },
        }
    }

    /// Freezes the clocks at `now`
    pub fn pause(&self, now: Instant) {
        let mut inner = self.inner.lock();
        if inner.pause_start.is_none() {
            inner.pause_start = Some(now);
        }
    }

    /// Unfreezes the clocks, excluding the paused interval
    ///
    /// Every reference instant shifts forward by the pause length so
    /// subsequent extrapolation never sees the gap.
    pub fn resume(&self, now: Instant) {
        let mut inner = self.inner.lock();
        if let Some(pause_start) = inner.pause_start.take() {
            let paused_for = now.saturating_duration_since(pause_start);
            inner.audio.shift_reference(paused_for);
            inner.video.shift_reference(paused_for);
            if let Some(play_start) = inner.play_start.as_mut() {
                *play_start += paused_for;
            }
        }
    }

    /// Repositions every clock to the seek target
    ///
    /// Normalization bases and first-seen flags are untouched; only the
    /// position, reference, and drift move. The external reference shifts
    /// so it also reports the target immediately — the UI position jumps
    /// to the target instead of momentarily reading zero. Any pause
    /// freeze is released; the seek worker re-freezes if it restores the
    /// Paused state.
    pub fn reset_for_seek(&self, target_ms: i64, now: Instant) {
        let mut inner = self.inner.lock();
        let target = target_ms as f64;

        inner.pause_start = None;
        inner.audio.reset_for_seek(target, now);
        inner.video.reset_for_seek(target, now);

        let base = Self::master_base_locked(&inner);
        let normalized_target = (target - base).max(0.0);
        inner.play_start = Some(now - Duration::from_secs_f64(normalized_target / 1000.0));

        debug!(target_ms, "clocks repositioned for seek");
    }

    /// Difference between a raw video PTS and the master clock
    ///
    /// Positive values mean the frame is early. The PTS is normalized
    /// with the video base, which is recorded here if this is the first
    /// video timestamp ever observed.
    pub fn video_delay_ms(&self, raw_video_pts_ms: f64, now: Instant) -> f64 {
        let mut inner = self.inner.lock();
        let normalized = inner.video.normalize(raw_video_pts_ms);
        normalized - Self::master_clock_locked(&inner, self.master(), now)
    }

    /// Applies the scheduling policy to a frame offset
    pub fn schedule(&self, offset_ms: f64) -> FrameAction {
        if offset_ms > self.thresholds.repeat_ms as f64 {
            FrameAction::Wait(Duration::from_secs_f64(offset_ms / 1000.0))
        } else if offset_ms < -(self.thresholds.drop_ms as f64) {
            FrameAction::Drop
        } else {
            FrameAction::Display
        }
    }

    /// Pushes an observed offset into the statistics ring
    ///
    /// Never alters scheduling.
    pub fn report_sync_offset(&self, offset_ms: f64) {
        let mut inner = self.inner.lock();
        if inner.offsets.len() == OFFSET_RING_CAPACITY {
            inner.offsets.pop_front();
        }
        inner.offsets.push_back(offset_ms);
        gauge!("zenplay_avsync_offset_ms", offset_ms);
    }

    /// Snapshot of the recently observed offsets, oldest first
    pub fn recent_offsets(&self) -> Vec<f64> {
        self.inner.lock().offsets.iter().copied().collect()
    }

    /// The master stream's normalization base in raw stream milliseconds
    ///
    /// Added back by the facade so the UI sees absolute media positions.
    pub fn master_base_ms(&self) -> f64 {
        Self::master_base_locked(&self.inner.lock())
    }

    fn master_base_locked(inner: &Inner) -> f64 {
        // Prefer the audio base; a video-only file falls back to video.
        let audio_base = inner.audio.base_ms();
        if audio_base != 0.0 {
            audio_base
        } else {
            inner.video.base_ms()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> SyncController {
        SyncController::new(MasterClock::Audio, SyncThresholds::default())
    }

    #[test]
    fn test_master_extrapolates_between_updates() {
        let sync = controller();
        let start = Instant::now();
        sync.update_audio_clock(0.0, start);

        let later = start + Duration::from_millis(500);
        assert!((sync.master_clock_ms(later) - 500.0).abs() < 1.0);
    }

    #[test]
    fn test_pause_freezes_master() {
        let sync = controller();
        let start = Instant::now();
        sync.update_audio_clock(0.0, start);

        let pause_at = start + Duration::from_millis(1000);
        sync.pause(pause_at);

        let much_later = pause_at + Duration::from_secs(10);
        let frozen = sync.master_clock_ms(much_later);
        assert!((frozen - 1000.0).abs() < 1.0);
    }

    #[test]
    fn test_resume_excludes_pause_interval() {
        let sync = controller();
        let start = Instant::now();
        sync.update_audio_clock(0.0, start);

        let pause_at = start + Duration::from_millis(1000);
        sync.pause(pause_at);
        let resume_at = pause_at + Duration::from_secs(2);
        sync.resume(resume_at);

        // Immediately after resume the clock reads the pause value...
        assert!((sync.master_clock_ms(resume_at) - 1000.0).abs() < 1.0);
        // ...and keeps advancing at 1x from there.
        let later = resume_at + Duration::from_millis(300);
        assert!((sync.master_clock_ms(later) - 1300.0).abs() < 1.0);
    }

    #[test]
    fn test_seek_reset_reports_target() {
        let sync = controller();
        let start = Instant::now();
        sync.update_audio_clock(0.0, start);

        let seek_at = start + Duration::from_millis(100);
        sync.reset_for_seek(30_000, seek_at);
        assert!((sync.master_clock_ms(seek_at) - 30_000.0).abs() < 1.0);
    }

    #[test]
    fn test_seek_does_not_renormalize() {
        let sync = controller();
        let start = Instant::now();
        // First frame of the file starts at 5 s of stream time.
        sync.update_audio_clock(5000.0, start);
        assert!((sync.master_base_ms() - 5000.0).abs() < 1e-9);

        sync.reset_for_seek(10_000, start + Duration::from_millis(10));
        // The base survives the seek.
        assert!((sync.master_base_ms() - 5000.0).abs() < 1e-9);
    }

    #[test]
    fn test_external_master_reports_target_after_seek() {
        let sync = SyncController::new(MasterClock::External, SyncThresholds::default());
        let start = Instant::now();
        sync.mark_play_start(start);

        let seek_at = start + Duration::from_millis(250);
        sync.reset_for_seek(42_000, seek_at);
        assert!((sync.master_clock_ms(seek_at) - 42_000.0).abs() < 1.0);
    }

    #[test]
    fn test_external_master_advances_in_real_time() {
        let sync = SyncController::new(MasterClock::External, SyncThresholds::default());
        let start = Instant::now();
        sync.mark_play_start(start);

        let later = start + Duration::from_millis(750);
        assert!((sync.master_clock_ms(later) - 750.0).abs() < 1.0);
    }

    #[test]
    fn test_schedule_policy_thresholds() {
        let sync = controller();
        assert!(matches!(sync.schedule(50.0), FrameAction::Wait(_)));
        assert_eq!(sync.schedule(10.0), FrameAction::Display);
        assert_eq!(sync.schedule(-50.0), FrameAction::Display);
        assert_eq!(sync.schedule(-150.0), FrameAction::Drop);
    }

    #[test]
    fn test_video_delay_against_audio_master() {
        let sync = controller();
        let start = Instant::now();
        sync.update_audio_clock(0.0, start);

        // Video frame 80 ms ahead of the audio clock.
        let delay = sync.video_delay_ms(80.0, start);
        assert!((delay - 80.0).abs() < 1.0);
    }

    #[test]
    fn test_offset_ring_is_bounded() {
        let sync = controller();
        for i in 0..100 {
            sync.report_sync_offset(i as f64);
        }
        let offsets = sync.recent_offsets();
        assert_eq!(offsets.len(), OFFSET_RING_CAPACITY);
        assert_eq!(offsets[0], 36.0);
        assert_eq!(*offsets.last().unwrap(), 99.0);
    }
}
