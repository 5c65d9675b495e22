//! Audio player sink

use crate::types::PipelineConfig;
use metrics::counter;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use zenplay_audio_decoder::{DecodedAudioFrame, Resampler};
use zenplay_audio_output::AudioSink;
use zenplay_av_sync::SyncController;
use zenplay_buffer_queue::BlockingQueue;
use zenplay_player_state::StateManager;
use zenplay_shared_types::AudioSpec;

struct AudioInner {
    spec: Option<AudioSpec>,
    resampler: Option<Resampler>,
    /// Resampled PCM not yet handed to the device; always belongs to the
    /// frame that set the current clock base.
    pending: VecDeque<f32>,
    /// PTS of the frame whose first sample was at the submission point
    /// when the base was last reset.
    base_pts_ms: f64,
    /// Interleaved sample values submitted since the base was set.
    values_submitted: u64,
    has_base: bool,
    /// Set once the decode task has queued the last frame of the stream.
    end_of_stream: bool,
    /// The rate converter's residual samples were already drained.
    tail_flushed: bool,
}

/// Audio sink: frame queue, resampling, device fill, audio clock
///
/// The device callback pulls decoded frames from the bounded queue,
/// resamples them to the negotiated format, and reports the submitted
/// position to the sync controller. The position derives from the sample
/// counter alone, never from wall-clock time; extrapolation between
/// callbacks is the sync controller's job.
pub struct AudioPlayer {
    state: Arc<StateManager>,
    sync: Arc<SyncController>,
    queue: Mutex<Arc<BlockingQueue<DecodedAudioFrame>>>,
    inner: Mutex<AudioInner>,
    volume_bits: AtomicU32,
    underruns: AtomicU64,
    capacity: usize,
}

impl AudioPlayer {
    /// Creates the player; the output format arrives later via
    /// [`configure`](AudioPlayer::configure)
    pub fn new(
        config: &PipelineConfig,
        state: Arc<StateManager>,
        sync: Arc<SyncController>,
        volume: f32,
    ) -> Self {
        Self {
            state,
            sync,
            queue: Mutex::new(Arc::new(BlockingQueue::new(config.audio_frame_capacity))),
            inner: Mutex::new(AudioInner {
                spec: None,
                resampler: None,
                pending: VecDeque::new(),
                base_pts_ms: 0.0,
                values_submitted: 0,
                has_base: false,
                end_of_stream: false,
                tail_flushed: false,
            }),
            volume_bits: AtomicU32::new(volume.clamp(0.0, 1.0).to_bits()),
            underruns: AtomicU64::new(0),
            capacity: config.audio_frame_capacity,
        }
    }

    /// Sets the format the device was actually opened with
    ///
    /// Until this runs the fill callback produces silence.
    pub fn configure(&self, spec: AudioSpec) {
        let mut inner = self.inner.lock();
        inner.spec = Some(spec);
        inner.resampler = Some(Resampler::new(spec));
        debug!(
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            "audio player configured"
        );
    }

    /// Blocks until the frame is queued or the pipeline shuts down
    ///
    /// Returns `false` on shutdown; the decode task exits then.
    pub fn push_frame(&self, frame: DecodedAudioFrame) -> bool {
        let queue = self.current_queue();
        queue.push(frame).is_ok()
    }

    /// Replaces a stopped queue ahead of a fresh worker start
    pub fn start(&self) {
        let mut queue = self.queue.lock();
        if queue.is_stopped() {
            *queue = Arc::new(BlockingQueue::new(self.capacity));
        }
        let mut inner = self.inner.lock();
        inner.end_of_stream = false;
        inner.tail_flushed = false;
    }

    /// Marks the stream as fully decoded
    ///
    /// Called by the decode task after the EOF sentinel, once every
    /// remaining frame is queued. When the queue then runs dry the fill
    /// callback drains the rate converter's residual samples instead of
    /// dropping them.
    pub fn mark_end_of_stream(&self) {
        self.inner.lock().end_of_stream = true;
    }

    /// Stops the queue, waking any blocked producer
    pub fn stop(&self) {
        self.current_queue().stop();
    }

    /// Discards queued frames and conversion state before a seek
    pub fn pre_seek(&self) {
        self.current_queue().clear_with(drop);
        let mut inner = self.inner.lock();
        inner.pending.clear();
        inner.has_base = false;
        inner.end_of_stream = false;
        inner.tail_flushed = false;
        if let Some(resampler) = inner.resampler.as_mut() {
            resampler.reset();
        }
    }

    /// Re-enables playback after a seek
    pub fn post_seek(&self) {
        // The first post-seek frame establishes a fresh clock base; no
        // state needs touching here.
    }

    /// Sets the output volume (0.0 to 1.0)
    pub fn set_volume(&self, volume: f32) {
        self.volume_bits
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Release);
    }

    /// Current output volume
    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Acquire))
    }

    /// Device callbacks that ran out of real audio
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Frames currently queued
    pub fn queue_len(&self) -> usize {
        self.current_queue().len()
    }

    fn current_queue(&self) -> Arc<BlockingQueue<DecodedAudioFrame>> {
        Arc::clone(&self.queue.lock())
    }
}

impl AudioSink for AudioPlayer {
    fn fill(&self, output: &mut [f32]) {
        output.fill(0.0);

        // Paused/seeking: silence, and crucially no clock update.
        if self.state.should_pause() || self.state.should_stop() {
            return;
        }

        let queue = self.current_queue();
        let mut inner = self.inner.lock();
        let AudioInner {
            spec,
            resampler,
            pending,
            base_pts_ms,
            values_submitted,
            has_base,
            end_of_stream,
            tail_flushed,
        } = &mut *inner;
        let Some(spec) = *spec else { return };
        let channels = spec.channels as usize;
        if channels == 0 {
            return;
        }

        let volume = self.volume();
        let mut filled = 0usize;
        let mut wrote_real = false;

        while filled < output.len() {
            if pending.is_empty() {
                let Ok(decoded) = queue.pop_timeout(Duration::ZERO) else {
                    // Queue dry. At end of stream the rate converter
                    // still buffers the tail of the audio; emit it once
                    // instead of dropping it.
                    if *end_of_stream && !*tail_flushed {
                        *tail_flushed = true;
                        if let Some(converter) = resampler.as_mut() {
                            let mut pcm = Vec::new();
                            match converter.drain(&mut pcm) {
                                Ok(_frames) => pending.extend(pcm),
                                Err(error) => warn!(%error, "audio tail drain failed"),
                            }
                        }
                        if !pending.is_empty() {
                            continue;
                        }
                    }
                    break;
                };
                // The first sample of this frame is the next one the
                // device receives: it becomes the clock base.
                *base_pts_ms = decoded.pts_ms as f64;
                *values_submitted = 0;
                *has_base = true;

                let converter = resampler.get_or_insert_with(|| Resampler::new(spec));
                let mut pcm = Vec::new();
                match converter.convert(&decoded.frame, &mut pcm) {
                    Ok(_frames) => pending.extend(pcm),
                    Err(error) => warn!(%error, "audio frame conversion failed"),
                }
                continue;
            }

            let take = (output.len() - filled).min(pending.len());
            for slot in output[filled..filled + take].iter_mut() {
                *slot = pending.pop_front().unwrap_or(0.0) * volume;
            }
            filled += take;
            *values_submitted += take as u64;
            wrote_real = true;
        }

        if filled < output.len() {
            self.underruns.fetch_add(1, Ordering::Relaxed);
            counter!("zenplay_audio_underruns", 1);
        }

        // Report the submitted position. The fixed device-buffer latency
        // becomes a constant offset the extrapolation absorbs; relative
        // A/V sync is unaffected.
        if wrote_real && *has_base {
            let frames = *values_submitted / channels as u64;
            let pts_ms = *base_pts_ms + spec.frames_to_ms(frames);
            self.sync.update_audio_clock(pts_ms, Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_next as ffmpeg;
    use ffmpeg::format::sample::Type as SampleType;
    use ffmpeg::format::Sample;
    use ffmpeg::frame::Audio;
    use ffmpeg::ChannelLayout;
    use zenplay_av_sync::{MasterClock, SyncThresholds};
    use zenplay_shared_types::PlayerState;

    fn playing_state() -> Arc<StateManager> {
        let state = Arc::new(StateManager::new());
        state.transition_to(PlayerState::Opening).unwrap();
        state.transition_to(PlayerState::Stopped).unwrap();
        state.transition_to(PlayerState::Playing).unwrap();
        state
    }

    fn player() -> (AudioPlayer, Arc<SyncController>, Arc<StateManager>) {
        let state = playing_state();
        let sync = Arc::new(SyncController::new(
            MasterClock::Audio,
            SyncThresholds::default(),
        ));
        let player = AudioPlayer::new(
            &PipelineConfig::default(),
            Arc::clone(&state),
            Arc::clone(&sync),
            1.0,
        );
        player.configure(AudioSpec::new(48_000, 2));
        (player, sync, state)
    }

    fn test_frame(pts_ms: i64, sample_frames: usize, value: f32) -> DecodedAudioFrame {
        let mut frame = Audio::new(
            Sample::F32(SampleType::Packed),
            sample_frames,
            ChannelLayout::STEREO,
        );
        frame.set_rate(48_000);
        let values = sample_frames * 2;
        let data = frame.data_mut(0);
        let samples = unsafe {
            std::slice::from_raw_parts_mut(data.as_mut_ptr() as *mut f32, values)
        };
        samples.fill(value);
        DecodedAudioFrame { frame, pts_ms }
    }

    #[test]
    fn test_fill_outputs_queued_samples() {
        let (player, _sync, _state) = player();
        assert!(player.push_frame(test_frame(0, 512, 0.25)));

        let mut output = vec![0.0f32; 256];
        player.fill(&mut output);
        assert!(output.iter().all(|&sample| (sample - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_fill_updates_audio_clock_from_sample_counter() {
        let (player, sync, _state) = player();
        assert!(player.push_frame(test_frame(1000, 4800, 0.1)));

        // Each fill takes 960 values = 480 frames = 10 ms at 48 kHz.
        // The first report sets the normalization base; the second is
        // 10 ms past it.
        let mut output = vec![0.0f32; 960];
        player.fill(&mut output);
        player.fill(&mut output);

        let clock = sync.master_clock_ms(Instant::now());
        assert!((clock - 10.0).abs() < 2.0, "clock was {clock}");
    }

    #[test]
    fn test_underrun_writes_silence() {
        let (player, _sync, _state) = player();
        let mut output = vec![1.0f32; 128];
        player.fill(&mut output);
        assert!(output.iter().all(|&sample| sample == 0.0));
        assert_eq!(player.underruns(), 1);
    }

    #[test]
    fn test_paused_fill_does_not_touch_clock() {
        let (player, sync, state) = player();
        assert!(player.push_frame(test_frame(0, 512, 0.5)));
        state.transition_to(PlayerState::Paused).unwrap();

        let mut output = vec![1.0f32; 128];
        player.fill(&mut output);

        assert!(output.iter().all(|&sample| sample == 0.0));
        // No update happened, so the clock has no reference and reads
        // zero.
        assert_eq!(sync.master_clock_ms(Instant::now()), 0.0);
    }

    #[test]
    fn test_volume_scales_output() {
        let (player, _sync, _state) = player();
        player.set_volume(0.5);
        assert!(player.push_frame(test_frame(0, 256, 0.8)));

        let mut output = vec![0.0f32; 128];
        player.fill(&mut output);
        assert!(output.iter().all(|&sample| (sample - 0.4).abs() < 1e-6));
    }

    #[test]
    fn test_pre_seek_discards_queue_and_pending() {
        let (player, _sync, _state) = player();
        assert!(player.push_frame(test_frame(0, 512, 0.3)));
        let mut output = vec![0.0f32; 64];
        player.fill(&mut output);

        player.pre_seek();
        assert_eq!(player.queue_len(), 0);

        let mut output = vec![1.0f32; 64];
        player.fill(&mut output);
        assert!(output.iter().all(|&sample| sample == 0.0));
    }

    #[test]
    fn test_end_of_stream_drains_converter_tail_once() {
        let (player, _sync, _state) = player();
        // A 44.1 kHz source against the 48 kHz output forces a real rate
        // conversion, so the converter holds back residual samples.
        let mut frame = Audio::new(
            Sample::F32(SampleType::Packed),
            4410,
            ChannelLayout::STEREO,
        );
        frame.set_rate(44_100);
        let values = 4410 * 2;
        let data = frame.data_mut(0);
        let samples = unsafe {
            std::slice::from_raw_parts_mut(data.as_mut_ptr() as *mut f32, values)
        };
        samples.fill(0.25);
        assert!(player.push_frame(DecodedAudioFrame { frame, pts_ms: 0 }));

        // Consume everything queued; the queue is dry but the stream is
        // not yet marked finished, so no tail is emitted.
        let mut output = vec![0.0f32; 4096];
        for _ in 0..4 {
            player.fill(&mut output);
        }

        player.mark_end_of_stream();
        // The next fill may carry the drained residue; after that only
        // silence remains.
        player.fill(&mut output);
        player.fill(&mut output);
        assert!(output.iter().all(|&sample| sample == 0.0));
    }

    #[test]
    fn test_push_fails_after_stop() {
        let (player, _sync, _state) = player();
        player.stop();
        assert!(!player.push_frame(test_frame(0, 64, 0.0)));
    }
}
