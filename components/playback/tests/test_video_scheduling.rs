//! Video player scheduling against a recording renderer

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use zenplay_av_sync::{MasterClock, SyncController, SyncThresholds};
use zenplay_playback::{PipelineConfig, VideoPlayer};
use zenplay_player_state::StateManager;
use zenplay_renderer::{
    RenderResult, RenderThread, Renderer, WindowHandle,
};
use zenplay_shared_types::PlayerState;
use zenplay_video_decoder::DecodedVideoFrame;

struct RecordingRenderer {
    rendered: Arc<AtomicUsize>,
    presented: Arc<AtomicUsize>,
    pts_log: Arc<Mutex<Vec<i64>>>,
}

impl Renderer for RecordingRenderer {
    fn init(&mut self, _window: WindowHandle, _w: u32, _h: u32) -> RenderResult<()> {
        Ok(())
    }

    fn render_frame(&mut self, frame: &DecodedVideoFrame) -> RenderResult<()> {
        self.rendered.fetch_add(1, Ordering::SeqCst);
        self.pts_log.lock().push(frame.pts_ms);
        Ok(())
    }

    fn present(&mut self) -> RenderResult<()> {
        self.presented.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_resize(&mut self, _w: u32, _h: u32) -> RenderResult<()> {
        Ok(())
    }

    fn clear(&mut self) -> RenderResult<()> {
        Ok(())
    }

    fn cleanup(&mut self) {}
}

struct Harness {
    state: Arc<StateManager>,
    sync: Arc<SyncController>,
    player: VideoPlayer,
    render_thread: RenderThread,
    rendered: Arc<AtomicUsize>,
    presented: Arc<AtomicUsize>,
    pts_log: Arc<Mutex<Vec<i64>>>,
}

fn harness(config: PipelineConfig, initial: PlayerState) -> Harness {
    let state = Arc::new(StateManager::new());
    state.transition_to(PlayerState::Opening).unwrap();
    state.transition_to(PlayerState::Stopped).unwrap();
    state.transition_to(PlayerState::Playing).unwrap();
    if initial == PlayerState::Paused {
        state.transition_to(PlayerState::Paused).unwrap();
    }

    let sync = Arc::new(SyncController::new(
        MasterClock::Audio,
        SyncThresholds::default(),
    ));

    let rendered = Arc::new(AtomicUsize::new(0));
    let presented = Arc::new(AtomicUsize::new(0));
    let pts_log = Arc::new(Mutex::new(Vec::new()));
    let renderer = RecordingRenderer {
        rendered: Arc::clone(&rendered),
        presented: Arc::clone(&presented),
        pts_log: Arc::clone(&pts_log),
    };

    let render_thread = RenderThread::spawn(Box::new(renderer)).unwrap();
    let player = VideoPlayer::new(
        &config,
        Arc::clone(&state),
        Arc::clone(&sync),
        render_thread.proxy(),
    );
    player.start();

    Harness {
        state,
        sync,
        player,
        render_thread,
        rendered,
        presented,
        pts_log,
    }
}

fn test_frame(pts_ms: i64) -> DecodedVideoFrame {
    let frame = ffmpeg_next::frame::Video::new(ffmpeg_next::format::Pixel::YUV420P, 64, 64);
    DecodedVideoFrame { frame, pts_ms }
}

fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

#[test]
fn test_on_time_frames_are_rendered_and_presented() {
    let h = harness(PipelineConfig::default(), PlayerState::Playing);
    h.sync.update_audio_clock(0.0, Instant::now());

    for pts_ms in [0, 20, 40] {
        assert!(h.player.push_frame_blocking(test_frame(pts_ms)));
    }

    assert!(wait_until(Duration::from_secs(2), || {
        h.rendered.load(Ordering::SeqCst) == 3
    }));
    assert_eq!(h.presented.load(Ordering::SeqCst), 3);
    assert_eq!(*h.pts_log.lock(), vec![0, 20, 40]);
    assert_eq!(h.player.frames_rendered(), 3);
    assert_eq!(h.player.frames_dropped(), 0);

    h.state.transition_to(PlayerState::Stopped).unwrap();
    h.player.stop();
    h.render_thread.shutdown();
}

#[test]
fn test_late_frames_are_dropped() {
    let h = harness(PipelineConfig::default(), PlayerState::Playing);
    // The audio clock has been running for a second; frames stamped at
    // the file start are hopelessly late.
    h.sync
        .update_audio_clock(0.0, Instant::now() - Duration::from_millis(1000));

    for pts_ms in [0, 20, 40] {
        assert!(h.player.push_frame_blocking(test_frame(pts_ms)));
    }

    assert!(wait_until(Duration::from_secs(2), || {
        h.player.frames_dropped() == 3
    }));
    assert_eq!(h.rendered.load(Ordering::SeqCst), 0);

    h.state.transition_to(PlayerState::Stopped).unwrap();
    h.player.stop();
    h.render_thread.shutdown();
}

#[test]
fn test_paused_player_holds_frames_and_pre_seek_discards_them() {
    let h = harness(PipelineConfig::default(), PlayerState::Paused);

    for pts_ms in [0, 20, 40] {
        assert!(h.player.push_frame_blocking(test_frame(pts_ms)));
    }
    // Paused: the scheduling loop must not consume.
    thread::sleep(Duration::from_millis(200));
    assert_eq!(h.rendered.load(Ordering::SeqCst), 0);
    assert_eq!(h.player.queue_len(), 3);

    h.player.pre_seek();
    assert_eq!(h.player.queue_len(), 0);

    h.state.transition_to(PlayerState::Stopped).unwrap();
    h.player.stop();
    h.render_thread.shutdown();
}

#[test]
fn test_push_blocks_at_watermark_until_stop() {
    let config = PipelineConfig {
        video_frame_capacity: 4,
        video_watermark_percent: 75,
        ..Default::default()
    };
    // Paused consumer: nothing drains the queue.
    let h = harness(config, PlayerState::Paused);

    for pts_ms in [0, 20, 40] {
        assert!(h.player.push_frame_blocking(test_frame(pts_ms)));
    }

    // The fourth push crosses the watermark and must block.
    let player = Arc::new(h.player);
    let blocked = {
        let player = Arc::clone(&player);
        thread::spawn(move || player.push_frame_blocking(test_frame(60)))
    };
    thread::sleep(Duration::from_millis(150));
    assert!(!blocked.is_finished());

    h.state.transition_to(PlayerState::Stopped).unwrap();
    player.stop();
    assert!(!blocked.join().unwrap());

    h.render_thread.shutdown();
}
