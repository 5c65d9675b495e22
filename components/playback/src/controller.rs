//! Playback controller: worker threads and the seek protocol

use crate::audio_player::AudioPlayer;
use crate::types::{PipelineConfig, PlaybackStats};
use crate::video_player::VideoPlayer;
use crossbeam_channel::{unbounded, Receiver, Sender};
use ffmpeg_next::Packet;
use metrics::counter;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use zenplay_audio_decoder::AudioDecoder;
use zenplay_av_sync::SyncController;
use zenplay_buffer_queue::BlockingQueue;
use zenplay_demuxer::{DemuxEvent, Demuxer};
use zenplay_player_state::StateManager;
use zenplay_shared_types::{PlayerState, SeekRequest};
use zenplay_video_decoder::VideoDecoder;

const RESUME_WAIT: Duration = Duration::from_secs(5);

type PacketQueue = Arc<BlockingQueue<Option<Packet>>>;

/// The video half of the pipeline
pub struct VideoLane {
    /// Decoder, shared with the seek worker for flushing
    pub decoder: Arc<Mutex<VideoDecoder>>,
    /// Frame sink
    pub player: Arc<VideoPlayer>,
}

/// The audio half of the pipeline
pub struct AudioLane {
    /// Decoder, shared with the seek worker for flushing
    pub decoder: Arc<Mutex<AudioDecoder>>,
    /// Frame sink
    pub player: Arc<AudioPlayer>,
}

struct Workers {
    video_packets: Option<PacketQueue>,
    audio_packets: Option<PacketQueue>,
    seek_tx: Sender<SeekRequest>,
    handles: Vec<JoinHandle<()>>,
}

/// Owns the demux, decode, and seek worker threads
///
/// Wires the bounded queues between demuxer, decoders, and players, and
/// executes the seek protocol on its dedicated worker. Workers spawn on
/// [`start`](PlaybackController::start) and join on
/// [`stop`](PlaybackController::stop); a stopped controller can start
/// again for the same open file.
pub struct PlaybackController {
    config: PipelineConfig,
    state: Arc<StateManager>,
    sync: Arc<SyncController>,
    demuxer: Arc<Mutex<Demuxer>>,
    video: Option<VideoLane>,
    audio: Option<AudioLane>,
    running: Mutex<Option<Workers>>,
    packets_demuxed: Arc<AtomicU64>,
    seeks_performed: Arc<AtomicU64>,
}

impl PlaybackController {
    /// Wires a controller over already-constructed components
    pub fn new(
        config: PipelineConfig,
        state: Arc<StateManager>,
        sync: Arc<SyncController>,
        demuxer: Arc<Mutex<Demuxer>>,
        video: Option<VideoLane>,
        audio: Option<AudioLane>,
    ) -> Self {
        Self {
            config,
            state,
            sync,
            demuxer,
            video,
            audio,
            running: Mutex::new(None),
            packets_demuxed: Arc::new(AtomicU64::new(0)),
            seeks_performed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Spawns the demux, decode, and seek threads
    pub fn start(&self) {
        let mut running = self.running.lock();
        if running.is_some() {
            return;
        }

        let video_packets: Option<PacketQueue> = self
            .video
            .as_ref()
            .map(|_| Arc::new(BlockingQueue::new(self.config.video_packet_capacity)));
        let audio_packets: Option<PacketQueue> = self
            .audio
            .as_ref()
            .map(|_| Arc::new(BlockingQueue::new(self.config.audio_packet_capacity)));
        let (seek_tx, seek_rx) = unbounded();
        let mut handles = Vec::new();

        if let Some(lane) = &self.video {
            lane.player.start();
        }
        if let Some(lane) = &self.audio {
            lane.player.start();
        }

        // Demux thread
        {
            let state = Arc::clone(&self.state);
            let demuxer = Arc::clone(&self.demuxer);
            let video_packets = video_packets.clone();
            let audio_packets = audio_packets.clone();
            let packets_demuxed = Arc::clone(&self.packets_demuxed);
            handles.push(spawn_worker("zenplay-demux", move || {
                demux_loop(state, demuxer, video_packets, audio_packets, packets_demuxed);
            }));
        }

        // Decode threads
        if let (Some(lane), Some(packets)) = (&self.video, &video_packets) {
            let state = Arc::clone(&self.state);
            let packets = Arc::clone(packets);
            let decoder = Arc::clone(&lane.decoder);
            let player = Arc::clone(&lane.player);
            let max_errors = self.config.max_transient_decode_errors;
            handles.push(spawn_worker("zenplay-video-decode", move || {
                video_decode_loop(state, packets, decoder, player, max_errors);
            }));
        }
        if let (Some(lane), Some(packets)) = (&self.audio, &audio_packets) {
            let state = Arc::clone(&self.state);
            let packets = Arc::clone(packets);
            let decoder = Arc::clone(&lane.decoder);
            let player = Arc::clone(&lane.player);
            let max_errors = self.config.max_transient_decode_errors;
            handles.push(spawn_worker("zenplay-audio-decode", move || {
                audio_decode_loop(state, packets, decoder, player, max_errors);
            }));
        }

        // Seek thread
        {
            let context = SeekContext {
                state: Arc::clone(&self.state),
                sync: Arc::clone(&self.sync),
                demuxer: Arc::clone(&self.demuxer),
                video_decoder: self.video.as_ref().map(|l| Arc::clone(&l.decoder)),
                video_player: self.video.as_ref().map(|l| Arc::clone(&l.player)),
                audio_decoder: self.audio.as_ref().map(|l| Arc::clone(&l.decoder)),
                audio_player: self.audio.as_ref().map(|l| Arc::clone(&l.player)),
                video_packets: video_packets.clone(),
                audio_packets: audio_packets.clone(),
                seeks_performed: Arc::clone(&self.seeks_performed),
            };
            handles.push(spawn_worker("zenplay-seek", move || {
                seek_loop(seek_rx, context);
            }));
        }

        *running = Some(Workers {
            video_packets,
            audio_packets,
            seek_tx,
            handles,
        });
        info!("playback workers started");
    }

    /// Stops every queue and joins every worker
    ///
    /// The state must already be a stop state so the loops observe it.
    pub fn stop(&self) {
        let taken = self.running.lock().take();
        let Some(workers) = taken else {
            return;
        };

        if let Some(queue) = &workers.video_packets {
            queue.stop();
        }
        if let Some(queue) = &workers.audio_packets {
            queue.stop();
        }
        if let Some(lane) = &self.video {
            lane.player.stop();
        }
        if let Some(lane) = &self.audio {
            lane.player.stop();
        }
        // Closing the channel ends the seek worker.
        drop(workers.seek_tx);

        for handle in workers.handles {
            if handle.join().is_err() {
                warn!("playback worker panicked during shutdown");
            }
        }
        info!("playback workers joined");
    }

    /// Enqueues a seek request; returns `false` when workers are down
    ///
    /// Requests queued faster than the seek worker drains them are
    /// coalesced to the newest one, which collapses rapid slider drags.
    pub fn seek_async(&self, request: SeekRequest) -> bool {
        let running = self.running.lock();
        match running.as_ref() {
            Some(workers) => workers.seek_tx.send(request).is_ok(),
            None => false,
        }
    }

    /// True while workers are running
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Counter snapshot across the pipeline
    pub fn stats(&self) -> PlaybackStats {
        PlaybackStats {
            packets_demuxed: self.packets_demuxed.load(Ordering::Relaxed),
            frames_rendered: self
                .video
                .as_ref()
                .map(|l| l.player.frames_rendered())
                .unwrap_or(0),
            frames_dropped: self
                .video
                .as_ref()
                .map(|l| l.player.frames_dropped())
                .unwrap_or(0),
            audio_underruns: self
                .audio
                .as_ref()
                .map(|l| l.player.underruns())
                .unwrap_or(0),
            seeks_performed: self.seeks_performed.load(Ordering::Relaxed),
        }
    }
}

fn spawn_worker(name: &str, body: impl FnOnce() + Send + 'static) -> JoinHandle<()> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .expect("worker thread spawn")
}

fn demux_loop(
    state: Arc<StateManager>,
    demuxer: Arc<Mutex<Demuxer>>,
    video_packets: Option<PacketQueue>,
    audio_packets: Option<PacketQueue>,
    packets_demuxed: Arc<AtomicU64>,
) {
    debug!("demux loop running");
    loop {
        if state.should_stop() {
            break;
        }
        if state.should_pause() {
            state.wait_for_resume(RESUME_WAIT);
            continue;
        }

        // Hold the demuxer lock only for the read; pushes block on
        // backpressure and must not starve the seek worker.
        let event = demuxer.lock().read_packet();
        match event {
            Ok(DemuxEvent::Video(packet)) => {
                packets_demuxed.fetch_add(1, Ordering::Relaxed);
                counter!("zenplay_packets_demuxed", 1);
                if let Some(queue) = &video_packets {
                    if queue.push(Some(packet)).is_err() {
                        break;
                    }
                }
            }
            Ok(DemuxEvent::Audio(packet)) => {
                packets_demuxed.fetch_add(1, Ordering::Relaxed);
                counter!("zenplay_packets_demuxed", 1);
                if let Some(queue) = &audio_packets {
                    if queue.push(Some(packet)).is_err() {
                        break;
                    }
                }
            }
            Ok(DemuxEvent::Skip) => {}
            Ok(DemuxEvent::Eof) => {
                info!("demuxer reached end of stream");
                if let Some(queue) = &video_packets {
                    let _ = queue.push(None);
                }
                if let Some(queue) = &audio_packets {
                    let _ = queue.push(None);
                }
                break;
            }
            Err(demux_error) => {
                error!(%demux_error, "demux failed");
                if state.transition_to(PlayerState::Error).is_err() {
                    warn!("demux error outside a recoverable state");
                }
                break;
            }
        }
    }
    debug!("demux loop exited");
}

fn video_decode_loop(
    state: Arc<StateManager>,
    packets: PacketQueue,
    decoder: Arc<Mutex<VideoDecoder>>,
    player: Arc<VideoPlayer>,
    max_errors: u32,
) {
    debug!("video decode loop running");
    loop {
        match packets.pop() {
            Err(_) => break,
            Ok(None) => {
                // EOF sentinel: emit what the codec still buffers, exit.
                let _ = decoder
                    .lock()
                    .drain(&mut |frame| {
                        player.push_frame_blocking(frame);
                    });
                break;
            }
            Ok(Some(packet)) => {
                // The player's watermark wait is the only throttle here.
                let result = decoder.lock().decode(&packet, &mut |frame| {
                    player.push_frame_blocking(frame);
                });
                if let Err(decode_error) = result {
                    let consecutive = decoder.lock().consecutive_errors();
                    if consecutive >= max_errors {
                        error!(%decode_error, consecutive, "video decoder failing persistently");
                        let _ = state.transition_to(PlayerState::Error);
                        break;
                    }
                    warn!(%decode_error, consecutive, "transient video decode error");
                }
            }
        }
    }
    debug!("video decode loop exited");
}

fn audio_decode_loop(
    state: Arc<StateManager>,
    packets: PacketQueue,
    decoder: Arc<Mutex<AudioDecoder>>,
    player: Arc<AudioPlayer>,
    max_errors: u32,
) {
    debug!("audio decode loop running");
    loop {
        match packets.pop() {
            Err(_) => break,
            Ok(None) => {
                let _ = decoder
                    .lock()
                    .drain(&mut |frame| {
                        player.push_frame(frame);
                    });
                // Every frame is queued; the fill callback may now
                // drain the rate converter's residue once the queue
                // runs dry.
                player.mark_end_of_stream();
                break;
            }
            Ok(Some(packet)) => {
                let result = decoder.lock().decode(&packet, &mut |frame| {
                    player.push_frame(frame);
                });
                if let Err(decode_error) = result {
                    let consecutive = decoder.lock().consecutive_errors();
                    if consecutive >= max_errors {
                        error!(%decode_error, consecutive, "audio decoder failing persistently");
                        let _ = state.transition_to(PlayerState::Error);
                        break;
                    }
                    warn!(%decode_error, consecutive, "transient audio decode error");
                }
            }
        }
    }
    debug!("audio decode loop exited");
}

struct SeekContext {
    state: Arc<StateManager>,
    sync: Arc<SyncController>,
    demuxer: Arc<Mutex<Demuxer>>,
    video_decoder: Option<Arc<Mutex<VideoDecoder>>>,
    video_player: Option<Arc<VideoPlayer>>,
    audio_decoder: Option<Arc<Mutex<AudioDecoder>>>,
    audio_player: Option<Arc<AudioPlayer>>,
    video_packets: Option<PacketQueue>,
    audio_packets: Option<PacketQueue>,
    seeks_performed: Arc<AtomicU64>,
}

fn seek_loop(requests: Receiver<SeekRequest>, context: SeekContext) {
    debug!("seek loop running");
    while let Ok(first) = requests.recv() {
        // Coalesce: rapid slider drags collapse to the newest target.
        let mut request = first;
        let mut collapsed = 0usize;
        while let Ok(newer) = requests.try_recv() {
            request = newer;
            collapsed += 1;
        }
        if collapsed > 0 {
            debug!(collapsed, "collapsed stale seek requests");
        }

        // Seek during shutdown is a no-op.
        if context.state.should_stop() {
            break;
        }
        if context.state.transition_to(PlayerState::Seeking).is_err() {
            continue;
        }
        info!(target_ms = request.target_ms, "seek started");

        // Players first: discarding queued frames releases their
        // hardware surfaces before anything else happens.
        if let Some(player) = &context.video_player {
            player.pre_seek();
        }
        if let Some(player) = &context.audio_player {
            player.pre_seek();
        }
        if let Some(queue) = &context.video_packets {
            queue.clear_with(drop);
        }
        if let Some(queue) = &context.audio_packets {
            queue.clear_with(drop);
        }

        let seek_result = context
            .demuxer
            .lock()
            .seek(request.target_ms, request.direction);

        if let Some(decoder) = &context.video_decoder {
            decoder.lock().flush();
        }
        if let Some(decoder) = &context.audio_decoder {
            decoder.lock().flush();
        }

        match seek_result {
            Ok(()) => {
                context
                    .sync
                    .reset_for_seek(request.target_ms, Instant::now());
                context.seeks_performed.fetch_add(1, Ordering::Relaxed);
                counter!("zenplay_seeks", 1);
            }
            Err(seek_error) => {
                // One bad target is not fatal; restore and move on.
                warn!(%seek_error, "seek failed, restoring previous state");
            }
        }

        if let Some(player) = &context.video_player {
            player.post_seek();
        }
        if let Some(player) = &context.audio_player {
            player.post_seek();
        }

        // Restoring Paused refreezes the clocks at the target.
        if request.resume_state == PlayerState::Paused {
            context.sync.pause(Instant::now());
        }
        if context.state.transition_to(request.resume_state).is_err() {
            warn!(
                target = request.resume_state.as_str(),
                "could not restore state after seek"
            );
        }
        info!(target_ms = request.target_ms, "seek finished");
    }
    debug!("seek loop exited");
}
