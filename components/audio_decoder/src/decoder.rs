//! Audio decoder wrapper

use crate::error::{AudioDecodeError, AudioDecodeResult};
use ffmpeg_next as ffmpeg;
use ffmpeg::codec::context::Context;
use ffmpeg::frame::Audio;
use ffmpeg::Packet;
use tracing::{debug, trace};
use zenplay_shared_types::TimeBase;

/// A decoded audio frame leaving the decoder
pub struct DecodedAudioFrame {
    /// The decoded frame in the source's native sample format
    pub frame: Audio,
    /// Presentation time in stream milliseconds
    pub pts_ms: i64,
}

// The frame owns its sample buffers; nothing aliases it across threads.
unsafe impl Send for DecodedAudioFrame {}

/// Send/receive wrapper around one audio codec context
pub struct AudioDecoder {
    decoder: ffmpeg::decoder::Audio,
    time_base: TimeBase,
    consecutive_errors: u32,
}

// The codec context is owned outright and every access is serialized
// behind the controller's mutex.
unsafe impl Send for AudioDecoder {}

impl AudioDecoder {
    /// Builds a decoder for the stream described by `parameters`
    ///
    /// # Errors
    ///
    /// Returns [`AudioDecodeError::InitFailed`] when the codec context
    /// cannot be opened.
    pub fn new(
        parameters: ffmpeg::codec::Parameters,
        time_base: TimeBase,
    ) -> AudioDecodeResult<Self> {
        let context = Context::from_parameters(parameters).map_err(|error| {
            AudioDecodeError::InitFailed {
                details: error.to_string(),
            }
        })?;
        let decoder = context
            .decoder()
            .audio()
            .map_err(|error| AudioDecodeError::InitFailed {
                details: error.to_string(),
            })?;

        Ok(Self {
            decoder,
            time_base,
            consecutive_errors: 0,
        })
    }

    /// Source sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.decoder.rate()
    }

    /// Source channel count
    pub fn channels(&self) -> u16 {
        self.decoder.channels()
    }

    /// Errors seen since the last successfully decoded frame
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Feeds one packet and emits every frame the codec releases
    ///
    /// Zero emissions is normal flow (the codec buffered the packet).
    pub fn decode(
        &mut self,
        packet: &Packet,
        emit: &mut dyn FnMut(DecodedAudioFrame),
    ) -> AudioDecodeResult<usize> {
        match self.decoder.send_packet(packet) {
            Ok(()) => {}
            Err(ffmpeg::Error::Other {
                errno: ffmpeg::util::error::EAGAIN,
            }) => {
                self.receive_all(emit)?;
                self.decoder.send_packet(packet).map_err(|error| {
                    self.record_error(AudioDecodeError::SendFailed {
                        details: error.to_string(),
                    })
                })?;
            }
            Err(error) => {
                return Err(self.record_error(AudioDecodeError::SendFailed {
                    details: error.to_string(),
                }));
            }
        }

        self.receive_all(emit)
    }

    /// Emits every frame still buffered inside the codec
    pub fn drain(&mut self, emit: &mut dyn FnMut(DecodedAudioFrame)) -> AudioDecodeResult<usize> {
        let _ = self.decoder.send_eof();
        self.receive_all(emit)
    }

    /// Discards buffered frames and resets the codec for post-seek input
    pub fn flush(&mut self) {
        let mut discarded = 0usize;
        let _ = self.drain(&mut |_frame| discarded += 1);
        self.decoder.flush();
        self.consecutive_errors = 0;
        debug!(discarded, "audio decoder flushed");
    }

    fn receive_all(
        &mut self,
        emit: &mut dyn FnMut(DecodedAudioFrame),
    ) -> AudioDecodeResult<usize> {
        let mut emitted = 0usize;
        loop {
            // Ownership transfer, as on the video side: fill a fresh
            // container and move it out.
            let mut frame = Audio::empty();
            match self.decoder.receive_frame(&mut frame) {
                Ok(()) => {
                    self.consecutive_errors = 0;
                    let pts_ms = frame
                        .pts()
                        .map(|pts| self.time_base.pts_to_ms(pts))
                        .unwrap_or(0);
                    trace!(pts_ms, samples = frame.samples(), "audio frame decoded");
                    emit(DecodedAudioFrame { frame, pts_ms });
                    emitted += 1;
                }
                Err(ffmpeg::Error::Other {
                    errno: ffmpeg::util::error::EAGAIN,
                })
                | Err(ffmpeg::Error::Eof) => return Ok(emitted),
                Err(error) => {
                    return Err(self.record_error(AudioDecodeError::ReceiveFailed {
                        details: error.to_string(),
                    }));
                }
            }
        }
    }

    fn record_error(&mut self, error: AudioDecodeError) -> AudioDecodeError {
        self.consecutive_errors += 1;
        error
    }
}
