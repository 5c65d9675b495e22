//! Demuxer wrapper over the library's format context

use crate::error::{DemuxError, DemuxResult};
use crate::options::protocol_options;
use crate::types::{AudioTrackInfo, MediaInfo, VideoTrackInfo};
use ffmpeg_next as ffmpeg;
use ffmpeg::ffi::{
    avformat_alloc_context, avformat_close_input, avformat_find_stream_info, avformat_open_input,
};
use ffmpeg::format::context::Input;
use ffmpeg::media::Type;
use ffmpeg::util::interrupt;
use ffmpeg::{Dictionary, Packet, Rational, Stream};
use std::ffi::CString;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};
use zenplay_shared_types::{NetworkConfig, SeekDirection, TimeBase};

/// Outcome of one packet read
pub enum DemuxEvent {
    /// A packet belonging to the selected video stream
    Video(Packet),
    /// A packet belonging to the selected audio stream
    Audio(Packet),
    /// A packet from a stream the pipeline is not playing
    Skip,
    /// End of the container
    Eof,
}

/// Opens a source and pulls packets from it
///
/// One demuxer exists per open file, owned by the playback controller
/// and driven from the demux thread.
pub struct Demuxer {
    input: Input,
    info: MediaInfo,
}

// The format context is owned outright; the demux thread and the seek
// worker serialize access behind one mutex.
unsafe impl Send for Demuxer {}

impl Demuxer {
    /// Opens `url` with protocol-appropriate options
    ///
    /// `abort` is polled by the library during blocking I/O; flipping it
    /// aborts a hung network open or read.
    ///
    /// # Errors
    ///
    /// Returns [`DemuxError::OpenFailed`] when the source cannot be
    /// opened and [`DemuxError::NoStreams`] when it contains neither an
    /// audio nor a video stream.
    pub fn open(url: &str, network: &NetworkConfig, abort: Arc<AtomicBool>) -> DemuxResult<Self> {
        crate::ensure_codec_init();

        let mut dictionary = Dictionary::new();
        for (key, value) in protocol_options(url, network) {
            dictionary.set(&key, &value);
        }

        debug!(url, "opening source");
        let input = open_with_dictionary_and_interrupt(url, dictionary, move || {
            abort.load(Ordering::Relaxed)
        })
        .map_err(|error| DemuxError::OpenFailed {
            details: error.to_string(),
        })?;

        let video = input.streams().best(Type::Video).map(|s| video_info(&s));
        let audio = input.streams().best(Type::Audio).map(|s| audio_info(&s));
        if video.is_none() && audio.is_none() {
            return Err(DemuxError::NoStreams);
        }

        let duration_ms = if input.duration() > 0 {
            // Container duration is in AV_TIME_BASE (microsecond) units.
            input.duration() / 1000
        } else {
            0
        };

        let info = MediaInfo {
            duration_ms,
            video,
            audio,
        };
        info!(
            url,
            duration_ms,
            has_video = info.video.is_some(),
            has_audio = info.audio.is_some(),
            "source opened"
        );

        Ok(Self { input, info })
    }

    /// Information about the opened source
    pub fn info(&self) -> &MediaInfo {
        &self.info
    }

    /// Total duration in milliseconds (0 when unknown)
    pub fn duration_ms(&self) -> i64 {
        self.info.duration_ms
    }

    /// Codec parameters of the selected video stream
    pub fn video_parameters(&self) -> Option<ffmpeg::codec::Parameters> {
        let index = self.info.video.as_ref()?.index;
        self.input.stream(index).map(|s| s.parameters())
    }

    /// Codec parameters of the selected audio stream
    pub fn audio_parameters(&self) -> Option<ffmpeg::codec::Parameters> {
        let index = self.info.audio.as_ref()?.index;
        self.input.stream(index).map(|s| s.parameters())
    }

    /// Reads the next packet in container order
    ///
    /// # Errors
    ///
    /// Returns [`DemuxError::ReadFailed`] on a non-recoverable library
    /// error; transient `EAGAIN` reads are retried internally.
    pub fn read_packet(&mut self) -> DemuxResult<DemuxEvent> {
        loop {
            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    let index = packet.stream();
                    if Some(index) == self.info.video.as_ref().map(|v| v.index) {
                        trace!(index, pts = ?packet.pts(), "video packet");
                        return Ok(DemuxEvent::Video(packet));
                    }
                    if Some(index) == self.info.audio.as_ref().map(|a| a.index) {
                        trace!(index, pts = ?packet.pts(), "audio packet");
                        return Ok(DemuxEvent::Audio(packet));
                    }
                    return Ok(DemuxEvent::Skip);
                }
                Err(ffmpeg::Error::Eof) => return Ok(DemuxEvent::Eof),
                Err(ffmpeg::Error::Other {
                    errno: ffmpeg::util::error::EAGAIN,
                }) => continue,
                Err(error) => {
                    return Err(DemuxError::ReadFailed {
                        details: error.to_string(),
                    })
                }
            }
        }
    }

    /// Repositions to the nearest keyframe relative to `target_ms`
    ///
    /// Backward lands at or before the target. Downstream queues and
    /// decoders are untouched; the playback controller flushes them.
    pub fn seek(&mut self, target_ms: i64, direction: SeekDirection) -> DemuxResult<()> {
        // The whole-container seek API works in AV_TIME_BASE units.
        let target = target_ms.saturating_mul(1000);
        let result = match direction {
            SeekDirection::Backward => self.input.seek(target, ..target),
            SeekDirection::Forward => self.input.seek(target, target..),
        };
        match result {
            Ok(()) => {
                debug!(target_ms, ?direction, "demuxer repositioned");
                Ok(())
            }
            Err(error) => {
                warn!(target_ms, %error, "demuxer seek failed");
                Err(DemuxError::SeekFailed {
                    details: error.to_string(),
                })
            }
        }
    }
}

fn rational_to_time_base(rational: Rational) -> TimeBase {
    TimeBase::new(rational.numerator(), rational.denominator())
}

fn codec_name(parameters: &ffmpeg::codec::Parameters) -> String {
    ffmpeg::decoder::find(parameters.id())
        .map(|codec| codec.name().to_string())
        .unwrap_or_else(|| format!("{:?}", parameters.id()))
}

fn video_info(stream: &Stream<'_>) -> VideoTrackInfo {
    let parameters = stream.parameters();
    // Dimensions live in the codec parameters, which the safe wrapper
    // does not surface without opening a decoder.
    let (width, height) = unsafe {
        let par = (*stream.as_ptr()).codecpar;
        ((*par).width.max(0) as u32, (*par).height.max(0) as u32)
    };

    let rate = stream.avg_frame_rate();
    let frame_rate = if rate.denominator() != 0 && rate.numerator() != 0 {
        Some(rate.numerator() as f64 / rate.denominator() as f64)
    } else {
        None
    };

    VideoTrackInfo {
        index: stream.index(),
        codec_name: codec_name(&parameters),
        width,
        height,
        time_base: rational_to_time_base(stream.time_base()),
        frame_rate,
    }
}

fn audio_info(stream: &Stream<'_>) -> AudioTrackInfo {
    let parameters = stream.parameters();
    let (sample_rate, channels) = unsafe {
        let par = (*stream.as_ptr()).codecpar;
        (
            (*par).sample_rate.max(0) as u32,
            (*par).ch_layout.nb_channels.max(0) as u16,
        )
    };

    AudioTrackInfo {
        index: stream.index(),
        codec_name: codec_name(&parameters),
        sample_rate,
        channels,
        time_base: rational_to_time_base(stream.time_base()),
    }
}

/// Opens an input with both an options dictionary and an interrupt
/// callback, which the safe wrapper only offers one at a time.
fn open_with_dictionary_and_interrupt<F>(
    url: &str,
    options: Dictionary,
    interrupt_fn: F,
) -> Result<Input, ffmpeg::Error>
where
    F: FnMut() -> bool + 'static,
{
    unsafe {
        let mut ps = avformat_alloc_context();
        (*ps).interrupt_callback = interrupt::new(Box::new(interrupt_fn)).interrupt;

        let path = CString::new(url).map_err(|_| ffmpeg::Error::InvalidData)?;
        let mut opts = options.disown();
        let res = avformat_open_input(&mut ps, path.as_ptr(), ptr::null_mut(), &mut opts);
        Dictionary::own(opts);

        match res {
            0 => match avformat_find_stream_info(ps, ptr::null_mut()) {
                r if r >= 0 => Ok(Input::wrap(ps)),
                e => {
                    avformat_close_input(&mut ps);
                    Err(ffmpeg::Error::from(e))
                }
            },
            e => Err(ffmpeg::Error::from(e)),
        }
    }
}
