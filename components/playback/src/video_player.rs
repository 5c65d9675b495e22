//! Video player sink

use crate::types::PipelineConfig;
use metrics::counter;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};
use zenplay_av_sync::{FrameAction, SyncController};
use zenplay_buffer_queue::{BlockingQueue, PopError};
use zenplay_player_state::StateManager;
use zenplay_renderer::RendererProxy;
use zenplay_video_decoder::DecodedVideoFrame;

/// How long the scheduling loop parks between state re-checks.
const RESUME_WAIT: Duration = Duration::from_secs(5);
/// Upper bound on one uninterrupted scheduling sleep slice.
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// State shared between the player handle and its scheduling thread.
struct Shared {
    watermark_lock: Mutex<()>,
    watermark_cv: Condvar,
    frames_rendered: AtomicU64,
    frames_dropped: AtomicU64,
}

impl Shared {
    fn wake_producers(&self) {
        let _guard = self.watermark_lock.lock();
        self.watermark_cv.notify_all();
    }
}

struct Running {
    queue: Arc<BlockingQueue<DecodedVideoFrame>>,
    thread: JoinHandle<()>,
}

/// Video sink: frame queue, per-frame scheduling, renderer hand-off
///
/// The decode task pushes through [`push_frame_blocking`], the single
/// backpressure point for video: it blocks while queue occupancy is
/// above the high watermark and wakes when the scheduling thread
/// consumes. The scheduling thread pops frames, judges each against the
/// master clock, and forwards the survivors to the renderer proxy —
/// whose calls execute on the designated render thread, never here.
///
/// [`push_frame_blocking`]: VideoPlayer::push_frame_blocking
pub struct VideoPlayer {
    state: Arc<StateManager>,
    sync: Arc<SyncController>,
    proxy: RendererProxy,
    running: Mutex<Option<Running>>,
    shared: Arc<Shared>,
    capacity: usize,
    watermark: usize,
}

impl VideoPlayer {
    /// Creates the player; workers start with
    /// [`start`](VideoPlayer::start)
    pub fn new(
        config: &PipelineConfig,
        state: Arc<StateManager>,
        sync: Arc<SyncController>,
        proxy: RendererProxy,
    ) -> Self {
        Self {
            state,
            sync,
            proxy,
            running: Mutex::new(None),
            shared: Arc::new(Shared {
                watermark_lock: Mutex::new(()),
                watermark_cv: Condvar::new(),
                frames_rendered: AtomicU64::new(0),
                frames_dropped: AtomicU64::new(0),
            }),
            capacity: config.video_frame_capacity,
            watermark: config.video_watermark(),
        }
    }

    /// Spawns the scheduling thread over a fresh frame queue
    pub fn start(&self) {
        let mut running = self.running.lock();
        if running.is_some() {
            return;
        }

        let queue = Arc::new(BlockingQueue::new(self.capacity));
        let loop_queue = Arc::clone(&queue);
        let state = Arc::clone(&self.state);
        let sync = Arc::clone(&self.sync);
        let proxy = self.proxy.clone();
        let shared = Arc::clone(&self.shared);

        let thread = thread::Builder::new()
            .name("zenplay-video-sched".to_string())
            .spawn(move || scheduling_loop(loop_queue, state, sync, proxy, shared))
            .expect("video scheduling thread spawn");

        *running = Some(Running { queue, thread });
        debug!("video player started");
    }

    /// Stops the queue and joins the scheduling thread
    pub fn stop(&self) {
        let taken = self.running.lock().take();
        if let Some(running) = taken {
            running.queue.stop();
            self.shared.wake_producers();
            if running.thread.join().is_err() {
                warn!("video scheduling thread panicked");
            }
            debug!("video player stopped");
        }
    }

    /// Blocks while the queue sits above the high watermark
    ///
    /// This is the only throttle in the video decode path. Returns
    /// `false` on shutdown.
    pub fn push_frame_blocking(&self, frame: DecodedVideoFrame) -> bool {
        let mut guard = self.shared.watermark_lock.lock();
        loop {
            let Some(queue) = self.current_queue() else {
                return false;
            };
            if queue.is_stopped() || self.state.should_stop() {
                return false;
            }
            if queue.len() < self.watermark {
                drop(guard);
                return queue.push(frame).is_ok();
            }
            self.shared.watermark_cv.wait(&mut guard);
        }
    }

    /// Discards queued frames ahead of a seek
    ///
    /// Dropping each frame releases its hardware surface back to the
    /// pool.
    pub fn pre_seek(&self) {
        if let Some(queue) = self.current_queue() {
            queue.clear_with(drop);
        }
        self.shared.wake_producers();
    }

    /// Re-enables rendering after a seek
    pub fn post_seek(&self) {
        // The scheduling loop resumes via the state manager's resume
        // broadcast; nothing to rebuild here.
    }

    /// Frames handed to the renderer so far
    pub fn frames_rendered(&self) -> u64 {
        self.shared.frames_rendered.load(Ordering::Relaxed)
    }

    /// Frames skipped for being late
    pub fn frames_dropped(&self) -> u64 {
        self.shared.frames_dropped.load(Ordering::Relaxed)
    }

    /// Frames currently queued
    pub fn queue_len(&self) -> usize {
        self.current_queue().map(|queue| queue.len()).unwrap_or(0)
    }

    fn current_queue(&self) -> Option<Arc<BlockingQueue<DecodedVideoFrame>>> {
        self.running.lock().as_ref().map(|r| Arc::clone(&r.queue))
    }
}

fn scheduling_loop(
    queue: Arc<BlockingQueue<DecodedVideoFrame>>,
    state: Arc<StateManager>,
    sync: Arc<SyncController>,
    proxy: RendererProxy,
    shared: Arc<Shared>,
) {
    debug!("video scheduling loop running");
    loop {
        if state.should_stop() {
            break;
        }
        if state.should_pause() {
            // Held (paused/seeking): no pops, no clock updates.
            state.wait_for_resume(RESUME_WAIT);
            continue;
        }

        let frame = match queue.pop_timeout(Duration::from_millis(100)) {
            Ok(frame) => frame,
            Err(PopError::TimedOut) => continue,
            Err(PopError::Stopped) => break,
        };
        shared.wake_producers();

        let now = Instant::now();
        let offset_ms = sync.video_delay_ms(frame.pts_ms as f64, now);
        sync.report_sync_offset(offset_ms);

        match sync.schedule(offset_ms) {
            FrameAction::Drop => {
                trace!(pts_ms = frame.pts_ms, offset_ms, "dropping late frame");
                shared.frames_dropped.fetch_add(1, Ordering::Relaxed);
                counter!("zenplay_video_frames_dropped", 1);
                continue;
            }
            FrameAction::Wait(delay) => {
                trace!(pts_ms = frame.pts_ms, ?delay, "waiting for display time");
                if !interruptible_sleep(&state, delay) {
                    break;
                }
            }
            FrameAction::Display => {}
        }

        sync.update_video_clock(frame.pts_ms as f64, Instant::now());

        let pts_ms = frame.pts_ms;
        if let Err(error) = proxy.render_frame(frame).and_then(|_| proxy.present()) {
            warn!(pts_ms, %error, "frame presentation failed");
            continue;
        }
        shared.frames_rendered.fetch_add(1, Ordering::Relaxed);
        counter!("zenplay_video_frames_rendered", 1);
    }
    debug!("video scheduling loop exited");
}

/// Sleeps up to `duration`, returning `false` when stop arrived
fn interruptible_sleep(state: &StateManager, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if state.should_stop() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(WAIT_SLICE));
    }
}
