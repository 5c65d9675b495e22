//! Player facade implementation

use crate::types::VideoOutputSetup;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use zenplay_audio_decoder::AudioDecoder;
use zenplay_audio_output::{AudioOutput, CpalOutput};
use zenplay_av_sync::{MasterClock, SyncController, SyncThresholds};
use zenplay_demuxer::{Demuxer, MediaInfo};
use zenplay_hardware_accel::{
    select_backends, HwDecoderContext, SharedGpuDevice, DEFAULT_EXTRA_SURFACES,
};
use zenplay_playback::{
    AudioLane, AudioPlayer, PipelineConfig, PlaybackController, PlaybackStats, VideoLane,
    VideoPlayer,
};
use zenplay_player_state::{CallbackId, StateManager};
use zenplay_renderer::{
    HardwareRenderer, RenderThread, Renderer, RendererProxy, SoftwareRenderer,
};
use zenplay_shared_types::{
    AudioSpec, PlayerConfig, PlayerError, PlayerResult, PlayerState, SeekRequest, SyncMethod,
};
use zenplay_video_decoder::VideoDecoder;

struct Session {
    sync: Arc<SyncController>,
    controller: PlaybackController,
    render_thread: Option<RenderThread>,
    render_proxy: Option<RendererProxy>,
    audio_output: Option<CpalOutput>,
    audio_player: Option<Arc<AudioPlayer>>,
    // Keeps the decode device alive for the duration of the open file.
    _hw_context: Option<Arc<HwDecoderContext>>,
    info: MediaInfo,
    abort: Arc<AtomicBool>,
}

/// The ZenPlay playback engine
///
/// One instance drives one window. All control methods are safe to call
/// from any thread; unrecoverable failures surface through the Error
/// state rather than panics, and the recovery path is
/// [`close`](ZenPlayer::close) followed by a fresh
/// [`open`](ZenPlayer::open).
///
/// # Examples
///
/// ```no_run
/// use zenplay_engine::ZenPlayer;
/// use zenplay_shared_types::PlayerConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let player = ZenPlayer::new(PlayerConfig::default());
/// player.open("/media/movie.mkv", None)?; // audio-only without a window
/// player.play()?;
/// # Ok(())
/// # }
/// ```
pub struct ZenPlayer {
    config: PlayerConfig,
    pipeline: PipelineConfig,
    state: Arc<StateManager>,
    session: Mutex<Option<Session>>,
}

impl ZenPlayer {
    /// Creates an engine with the given configuration
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            pipeline: PipelineConfig::default(),
            state: Arc::new(StateManager::new()),
            session: Mutex::new(None),
        }
    }

    /// Current playback state
    pub fn state(&self) -> PlayerState {
        self.state.state()
    }

    /// Registers a state-change observer; fires synchronously on the
    /// transitioning thread and must not block
    pub fn register_state_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(PlayerState, PlayerState) + Send + Sync + 'static,
    {
        self.state.register_callback(callback)
    }

    /// Removes a state-change observer
    pub fn unregister_state_callback(&self, id: CallbackId) {
        self.state.unregister_callback(id)
    }

    /// Opens a source and wires the pipeline
    ///
    /// The render path is chosen here, after demuxing, because the
    /// hardware decision needs the codec and dimensions. Sources without
    /// a video stream (or callers without a window) pass `None`.
    ///
    /// # Errors
    ///
    /// On failure the state moves to Error and the cause is returned;
    /// recover with [`close`](ZenPlayer::close).
    pub fn open(&self, url: &str, video_setup: Option<VideoOutputSetup>) -> PlayerResult<()> {
        self.state.transition_to(PlayerState::Opening)?;

        match self.open_inner(url, video_setup) {
            Ok(session) => {
                *self.session.lock() = Some(session);
                self.state.transition_to(PlayerState::Stopped)?;
                info!(url, "open complete");
                Ok(())
            }
            Err(open_error) => {
                error!(url, %open_error, "open failed");
                let _ = self.state.transition_to(PlayerState::Error);
                Err(open_error)
            }
        }
    }

    fn open_inner(&self, url: &str, video_setup: Option<VideoOutputSetup>) -> PlayerResult<Session> {
        let abort = Arc::new(AtomicBool::new(false));
        let demuxer = Demuxer::open(url, &self.config.network, Arc::clone(&abort))?;
        let info = demuxer.info().clone();

        let sync = Arc::new(SyncController::new(
            self.select_master(&info),
            SyncThresholds {
                repeat_ms: SyncThresholds::default().repeat_ms,
                drop_ms: self.config.sync.correction_threshold_ms,
            },
        ));

        // Audio lane
        let mut audio_lane = None;
        let mut audio_output = None;
        let mut audio_player_handle = None;
        if let (Some(track), Some(parameters)) = (&info.audio, demuxer.audio_parameters()) {
            let decoder = AudioDecoder::new(parameters, track.time_base)?;
            let player = Arc::new(AudioPlayer::new(
                &self.pipeline,
                Arc::clone(&self.state),
                Arc::clone(&sync),
                self.config.audio.volume,
            ));
            let requested = AudioSpec::new(self.config.audio.sample_rate, self.config.audio.channels);
            let output = CpalOutput::open(requested, Arc::clone(&player) as _)?;
            player.configure(output.spec());

            audio_player_handle = Some(Arc::clone(&player));
            audio_output = Some(output);
            audio_lane = Some(AudioLane {
                decoder: Arc::new(Mutex::new(decoder)),
                player,
            });
        }

        // Video lane with the hardware/software chooser
        let mut video_lane = None;
        let mut render_thread = None;
        let mut render_proxy = None;
        let mut hw_context = None;
        if let (Some(track), Some(parameters), Some(setup)) =
            (&info.video, demuxer.video_parameters(), video_setup)
        {
            let (window, width, height) = (setup.window, setup.width, setup.height);
            let (decoder, renderer, hw) =
                self.build_video_path(parameters, track.time_base, setup)?;
            hw_context = hw;

            let thread = RenderThread::spawn(renderer)?;
            let proxy = thread.proxy();
            // First native-graphics call; it executes on the render
            // thread like every later one.
            proxy.init(window, width, height)?;

            let player = Arc::new(VideoPlayer::new(
                &self.pipeline,
                Arc::clone(&self.state),
                Arc::clone(&sync),
                proxy.clone(),
            ));
            render_proxy = Some(proxy);
            render_thread = Some(thread);
            video_lane = Some(VideoLane {
                decoder: Arc::new(Mutex::new(decoder)),
                player,
            });
        }

        let controller = PlaybackController::new(
            self.pipeline.clone(),
            Arc::clone(&self.state),
            Arc::clone(&sync),
            Arc::new(Mutex::new(demuxer)),
            video_lane,
            audio_lane,
        );

        Ok(Session {
            sync,
            controller,
            render_thread,
            render_proxy,
            audio_output,
            audio_player: audio_player_handle,
            _hw_context: hw_context,
            info,
            abort,
        })
    }

    /// Render-path chooser: hardware first when permitted, software on
    /// any failure along the way
    fn build_video_path(
        &self,
        parameters: ffmpeg_next::codec::Parameters,
        time_base: zenplay_shared_types::TimeBase,
        mut setup: VideoOutputSetup,
    ) -> PlayerResult<(VideoDecoder, Box<dyn Renderer>, Option<Arc<HwDecoderContext>>)> {
        let priority = &self.config.video.decoder_priority;

        if self.config.render.use_hardware_acceleration {
            if let Some((hw, device)) = self.create_hw_context() {
                let hardware_attempt = self.try_hardware_path(
                    parameters.clone(),
                    time_base,
                    &mut setup,
                    &hw,
                    device,
                    priority,
                );
                match hardware_attempt {
                    Ok((decoder, renderer)) => {
                        return Ok((decoder, renderer, Some(Arc::new(hw))));
                    }
                    Err(hw_error) if self.config.render.hardware.allow_fallback => {
                        warn!(%hw_error, "hardware render path failed, falling back to software");
                    }
                    Err(hw_error) => return Err(hw_error),
                }
            } else if !self.config.render.hardware.allow_fallback {
                return Err(PlayerError::HwAccel {
                    details: "no hardware backend available and fallback disabled".to_string(),
                });
            }
        }

        let decoder = VideoDecoder::new(parameters, time_base, None, priority)?;
        let renderer: Box<dyn Renderer> = Box::new(SoftwareRenderer::new(setup.display_surface));
        debug!("software render path selected");
        Ok((decoder, renderer, None))
    }

    fn create_hw_context(&self) -> Option<(HwDecoderContext, SharedGpuDevice)> {
        for backend in select_backends(&self.config.render) {
            match HwDecoderContext::new(backend, DEFAULT_EXTRA_SURFACES) {
                Ok(context) => {
                    let device = context.share_device();
                    return Some((context, device));
                }
                Err(hw_error) => {
                    warn!(backend = backend.name(), %hw_error, "hardware backend unavailable");
                }
            }
        }
        None
    }

    fn try_hardware_path(
        &self,
        parameters: ffmpeg_next::codec::Parameters,
        time_base: zenplay_shared_types::TimeBase,
        setup: &mut VideoOutputSetup,
        hw: &HwDecoderContext,
        device: SharedGpuDevice,
        priority: &[String],
    ) -> PlayerResult<(VideoDecoder, Box<dyn Renderer>)> {
        let factory = setup.gpu_target.as_mut().ok_or_else(|| PlayerError::Render {
            details: "host supplied no GPU draw target".to_string(),
        })?;
        let target = factory.create(device.clone())?;
        let decoder = VideoDecoder::new(parameters, time_base, Some(hw), priority)?;
        let renderer: Box<dyn Renderer> = Box::new(HardwareRenderer::new(device, target));
        info!(backend = hw.backend().name(), "hardware render path selected");
        Ok((decoder, renderer))
    }

    /// Starts or resumes playback
    pub fn play(&self) -> PlayerResult<()> {
        let session = self.session.lock();
        let session = session
            .as_ref()
            .ok_or_else(|| not_open("play"))?;

        let old = self.state.transition_to(PlayerState::Playing)?;
        match old {
            PlayerState::Stopped => {
                session.controller.start();
                session.sync.mark_play_start(Instant::now());
                if let Some(output) = &session.audio_output {
                    output.start()?;
                }
            }
            PlayerState::Paused => {
                session.sync.resume(Instant::now());
                if let Some(output) = &session.audio_output {
                    output.resume()?;
                }
            }
            // Seeking → Playing is normally the seek worker's edge; a
            // user race landing here needs no extra work.
            _ => {}
        }
        info!("playing");
        Ok(())
    }

    /// Pauses playback; the clocks freeze and audio goes silent
    pub fn pause(&self) -> PlayerResult<()> {
        let session = self.session.lock();
        let session = session
            .as_ref()
            .ok_or_else(|| not_open("pause"))?;

        self.state.transition_to(PlayerState::Paused)?;
        session.sync.pause(Instant::now());
        if let Some(output) = &session.audio_output {
            output.pause()?;
        }
        info!("paused");
        Ok(())
    }

    /// Stops playback and joins every worker
    pub fn stop(&self) -> PlayerResult<()> {
        let session = self.session.lock();
        let session = session
            .as_ref()
            .ok_or_else(|| not_open("stop"))?;

        self.state.transition_to(PlayerState::Stopped)?;
        session.controller.stop();
        if let Some(output) = &session.audio_output {
            output.stop()?;
        }
        info!("stopped");
        Ok(())
    }

    /// Enqueues an asynchronous seek and returns immediately
    ///
    /// Completion is observed through the state-change callback when the
    /// state leaves Seeking.
    pub fn seek_async(&self, target_ms: i64) -> PlayerResult<()> {
        if target_ms < 0 {
            return Err(PlayerError::invalid_argument(format!(
                "seek target must be non-negative, got {target_ms}"
            )));
        }
        let session = self.session.lock();
        let session = session
            .as_ref()
            .ok_or_else(|| not_open("seek"))?;

        let resume_state = match self.state.state() {
            PlayerState::Playing | PlayerState::Seeking => PlayerState::Playing,
            PlayerState::Paused | PlayerState::Stopped => PlayerState::Paused,
            other => {
                return Err(PlayerError::InvalidStateTransition {
                    from: other.as_str(),
                    to: PlayerState::Seeking.as_str(),
                })
            }
        };

        if !session.controller.seek_async(SeekRequest::new(target_ms, resume_state)) {
            return Err(PlayerError::NotInitialized {
                details: "playback workers are not running".to_string(),
            });
        }
        debug!(target_ms, "seek queued");
        Ok(())
    }

    /// Tears the session down and returns to Idle
    pub fn close(&self) -> PlayerResult<()> {
        let taken = self.session.lock().take();
        let Some(session) = taken else {
            // No session: a failed open may still have left the Error
            // state behind; reset it. Close on Idle is a no-op.
            if self.state.state() != PlayerState::Idle {
                self.state.transition_to(PlayerState::Idle)?;
            }
            return Ok(());
        };

        // Abort any blocking demuxer I/O before joining workers.
        session.abort.store(true, Ordering::Relaxed);

        if !self.state.should_stop() {
            let _ = self.state.transition_to(PlayerState::Stopped);
        }
        session.controller.stop();

        if let Some(mut output) = session.audio_output {
            output.close();
        }
        if let Some(render_thread) = session.render_thread {
            render_thread.shutdown();
        }
        drop(session.audio_player);

        self.state.transition_to(PlayerState::Idle)?;
        info!("closed");
        Ok(())
    }

    /// Forwards a window resize to the renderer
    ///
    /// Callable from the host's resize event on any thread; the call
    /// executes on the render thread via the proxy.
    pub fn resize(&self, width: u32, height: u32) -> PlayerResult<()> {
        let session = self.session.lock();
        if let Some(proxy) = session.as_ref().and_then(|s| s.render_proxy.as_ref()) {
            proxy.on_resize(width, height)?;
        }
        Ok(())
    }

    /// Information about the opened source
    pub fn media_info(&self) -> Option<MediaInfo> {
        self.session.lock().as_ref().map(|s| s.info.clone())
    }

    /// Absolute media position in milliseconds for the UI
    ///
    /// Master clock plus the normalization base, so the value tracks the
    /// file's own timeline and never collapses to zero after a seek.
    pub fn current_time_ms(&self) -> i64 {
        let session = self.session.lock();
        match session.as_ref() {
            Some(session) => {
                let now = Instant::now();
                (session.sync.master_clock_ms(now) + session.sync.master_base_ms()).round() as i64
            }
            None => 0,
        }
    }

    /// Total duration in milliseconds (0 when unknown)
    pub fn duration_ms(&self) -> i64 {
        self.session
            .lock()
            .as_ref()
            .map(|session| session.info.duration_ms)
            .unwrap_or(0)
    }

    /// Sets the audio volume (0.0 to 1.0)
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::InvalidArgument`] outside the valid range.
    pub fn set_volume(&self, volume: f32) -> PlayerResult<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlayerError::invalid_argument(format!(
                "volume must be between 0.0 and 1.0, got {volume}"
            )));
        }
        let session = self.session.lock();
        if let Some(player) = session.as_ref().and_then(|s| s.audio_player.as_ref()) {
            player.set_volume(volume);
        }
        Ok(())
    }

    /// Pipeline counter snapshot
    pub fn stats(&self) -> PlaybackStats {
        self.session
            .lock()
            .as_ref()
            .map(|session| session.controller.stats())
            .unwrap_or_default()
    }

    fn select_master(&self, info: &MediaInfo) -> MasterClock {
        match self.config.sync.method {
            SyncMethod::Audio if info.audio.is_some() => MasterClock::Audio,
            SyncMethod::Video if info.video.is_some() => MasterClock::Video,
            SyncMethod::External => MasterClock::External,
            // Configured master has no stream to follow: wall clock.
            _ => MasterClock::External,
        }
    }
}

impl Drop for ZenPlayer {
    fn drop(&mut self) {
        if self.session.lock().is_some() {
            let _ = self.close();
        }
    }
}

fn not_open(operation: &str) -> PlayerError {
    PlayerError::NotInitialized {
        details: format!("{operation} requires an open source"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_calls_require_open() {
        let player = ZenPlayer::new(PlayerConfig::default());
        assert!(matches!(
            player.play(),
            Err(PlayerError::NotInitialized { .. })
        ));
        assert!(matches!(
            player.pause(),
            Err(PlayerError::NotInitialized { .. })
        ));
        assert!(matches!(
            player.seek_async(1000),
            Err(PlayerError::NotInitialized { .. })
        ));
    }

    #[test]
    fn test_open_missing_file_enters_error_state() {
        let player = ZenPlayer::new(PlayerConfig::default());
        let result = player.open("/nonexistent/zenplay-missing.mp4", None);
        assert!(result.is_err());
        assert_eq!(player.state(), PlayerState::Error);

        // Recovery path: close back to Idle.
        player.close().unwrap();
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn test_negative_seek_rejected() {
        let player = ZenPlayer::new(PlayerConfig::default());
        assert!(matches!(
            player.seek_async(-5),
            Err(PlayerError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_invalid_volume_rejected() {
        let player = ZenPlayer::new(PlayerConfig::default());
        assert!(player.set_volume(0.0).is_ok());
        assert!(player.set_volume(1.0).is_ok());
        assert!(player.set_volume(1.5).is_err());
        assert!(player.set_volume(-0.1).is_err());
    }

    #[test]
    fn test_idle_accessors() {
        let player = ZenPlayer::new(PlayerConfig::default());
        assert_eq!(player.current_time_ms(), 0);
        assert_eq!(player.duration_ms(), 0);
        assert_eq!(player.stats(), PlaybackStats::default());
        assert_eq!(player.state(), PlayerState::Idle);
    }
}
