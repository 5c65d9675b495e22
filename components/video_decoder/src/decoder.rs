//! Video decoder wrapper

use crate::error::{DecodeError, DecodeResult};
use ffmpeg_next as ffmpeg;
use ffmpeg::codec::context::Context;
use ffmpeg::frame::Video;
use ffmpeg::Packet;
use tracing::{debug, trace, warn};
use zenplay_shared_types::TimeBase;
use zenplay_hardware_accel::HwDecoderContext;

/// A decoded video frame leaving the decoder
///
/// Owns its frame outright. On the hardware path the frame holds the
/// only pipeline reference to its GPU surface; dropping the frame (or
/// the frame queue releasing it during seek) returns the surface to the
/// pool.
pub struct DecodedVideoFrame {
    /// The decoded frame, possibly GPU-surface backed
    pub frame: Video,
    /// Presentation time in stream milliseconds
    ///
    /// Taken from the frame's own timestamp, not the best-effort guess,
    /// which can report DTS for B-frames and jump backwards.
    pub pts_ms: i64,
}

impl DecodedVideoFrame {
    /// True when the planar data lives in a GPU surface
    pub fn is_hardware(&self) -> bool {
        unsafe { !(*self.frame.as_ptr()).hw_frames_ctx.is_null() }
    }
}

// The frame owns its buffers (or the sole pipeline reference to a pooled
// surface); nothing aliases it across threads.
unsafe impl Send for DecodedVideoFrame {}

/// Send/receive wrapper around one video codec context
pub struct VideoDecoder {
    decoder: ffmpeg::decoder::Video,
    time_base: TimeBase,
    hardware: bool,
    consecutive_errors: u32,
}

// The codec context is owned outright (built from stream parameters, not
// borrowed from the format context) and every access is serialized
// behind the controller's mutex.
unsafe impl Send for VideoDecoder {}

impl VideoDecoder {
    /// Builds a decoder for the stream described by `parameters`
    ///
    /// When `hw` is provided the hardware context is wired in before the
    /// codec opens, so the format-selection callback can size the surface
    /// pool. `priority` names decoders to try ahead of the stream
    /// default.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InitFailed`] when every candidate context
    /// fails to open.
    pub fn new(
        parameters: ffmpeg::codec::Parameters,
        time_base: TimeBase,
        hw: Option<&HwDecoderContext>,
        priority: &[String],
    ) -> DecodeResult<Self> {
        let codec_id = parameters.id();

        // Named overrides first, stream default last.
        for name in priority {
            let Some(codec) = ffmpeg::decoder::find_by_name(name) else {
                continue;
            };
            if codec.id() != codec_id {
                continue;
            }
            match Self::open_with(parameters.clone(), time_base, hw, Some(codec)) {
                Ok(decoder) => {
                    debug!(decoder = name.as_str(), "video decoder opened by priority");
                    return Ok(decoder);
                }
                Err(error) => {
                    warn!(decoder = name.as_str(), %error, "priority decoder failed, trying next");
                }
            }
        }

        Self::open_with(parameters, time_base, hw, None)
    }

    fn open_with(
        parameters: ffmpeg::codec::Parameters,
        time_base: TimeBase,
        hw: Option<&HwDecoderContext>,
        codec: Option<ffmpeg::Codec>,
    ) -> DecodeResult<Self> {
        let mut context = Context::from_parameters(parameters).map_err(|error| {
            DecodeError::InitFailed {
                details: error.to_string(),
            }
        })?;

        if let Some(hw) = hw {
            // Must precede the open; the callback participates in it.
            unsafe { hw.attach_to(context.as_mut_ptr()) };
        }

        let decoder = match codec {
            Some(codec) => context
                .decoder()
                .open_as(codec)
                .and_then(|opened| opened.video()),
            None => context.decoder().video(),
        }
        .map_err(|error| DecodeError::InitFailed {
            details: error.to_string(),
        })?;

        Ok(Self {
            decoder,
            time_base,
            hardware: hw.is_some(),
            consecutive_errors: 0,
        })
    }

    /// Width of the coded frames in pixels
    pub fn width(&self) -> u32 {
        self.decoder.width()
    }

    /// Height of the coded frames in pixels
    pub fn height(&self) -> u32 {
        self.decoder.height()
    }

    /// The software pixel format the decoder reports
    pub fn format(&self) -> ffmpeg::format::Pixel {
        self.decoder.format()
    }

    /// True when a hardware context is attached
    pub fn is_hardware(&self) -> bool {
        self.hardware
    }

    /// Errors seen since the last successfully decoded frame
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Feeds one packet and emits every frame the codec releases
    ///
    /// Returns the number of frames emitted. Zero is normal flow: the
    /// codec buffered the packet and is waiting for more input.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::SendFailed`] or
    /// [`DecodeError::ReceiveFailed`] on library errors other than the
    /// buffered-packet code.
    pub fn decode(
        &mut self,
        packet: &Packet,
        emit: &mut dyn FnMut(DecodedVideoFrame),
    ) -> DecodeResult<usize> {
        match self.decoder.send_packet(packet) {
            Ok(()) => {}
            Err(ffmpeg::Error::Other {
                errno: ffmpeg::util::error::EAGAIN,
            }) => {
                // The codec wants draining before more input.
                self.receive_all(emit)?;
                self.decoder
                    .send_packet(packet)
                    .map_err(|error| self.record_error(DecodeError::SendFailed {
                        details: error.to_string(),
                    }))?;
            }
            Err(error) => {
                return Err(self.record_error(DecodeError::SendFailed {
                    details: error.to_string(),
                }));
            }
        }

        self.receive_all(emit)
    }

    /// Emits every frame still buffered inside the codec
    ///
    /// Used at end of stream, where B-frame reordering can hold several
    /// displayable frames back.
    pub fn drain(&mut self, emit: &mut dyn FnMut(DecodedVideoFrame)) -> DecodeResult<usize> {
        let _ = self.decoder.send_eof();
        self.receive_all(emit)
    }

    /// Discards buffered frames and resets the codec for post-seek input
    pub fn flush(&mut self) {
        let mut discarded = 0usize;
        let _ = self.drain(&mut |_frame| discarded += 1);
        self.decoder.flush();
        self.consecutive_errors = 0;
        debug!(discarded, "video decoder flushed");
    }

    fn receive_all(
        &mut self,
        emit: &mut dyn FnMut(DecodedVideoFrame),
    ) -> DecodeResult<usize> {
        let mut emitted = 0usize;
        loop {
            // A fresh container per frame: receive fills it and we move
            // it out, leaving the codec workspace empty. Cloning instead
            // of moving keeps a surface reference alive inside the
            // workspace and exhausts the pool once B-frames arrive.
            let mut frame = Video::empty();
            match self.decoder.receive_frame(&mut frame) {
                Ok(()) => {
                    self.consecutive_errors = 0;
                    let pts_ms = frame
                        .pts()
                        .map(|pts| self.time_base.pts_to_ms(pts))
                        .unwrap_or(0);
                    trace!(pts_ms, "video frame decoded");
                    emit(DecodedVideoFrame { frame, pts_ms });
                    emitted += 1;
                }
                Err(ffmpeg::Error::Other {
                    errno: ffmpeg::util::error::EAGAIN,
                })
                | Err(ffmpeg::Error::Eof) => return Ok(emitted),
                Err(error) => {
                    return Err(self.record_error(DecodeError::ReceiveFailed {
                        details: error.to_string(),
                    }));
                }
            }
        }
    }

    fn record_error(&mut self, error: DecodeError) -> DecodeError {
        self.consecutive_errors += 1;
        error
    }
}
