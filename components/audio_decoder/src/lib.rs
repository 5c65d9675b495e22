//! # audio_decoder Component
//!
//! Audio decoding and sample-format adaptation.
//!
//! The decoder mirrors the video side's send/receive wrapper; the
//! [`Resampler`] adapts whatever the source delivers (rate, layout,
//! sample format) to the interleaved f32 stream the output device was
//! opened with. The resampler is built lazily from the first decoded
//! frame, because the real source format is only trustworthy once a
//! frame exists.

mod decoder;
mod error;
mod resampler;

pub use decoder::{AudioDecoder, DecodedAudioFrame};
pub use error::{AudioDecodeError, AudioDecodeResult};
pub use resampler::Resampler;
