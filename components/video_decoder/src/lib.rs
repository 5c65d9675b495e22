//! # video_decoder Component
//!
//! Video decoding for the playback pipeline.
//!
//! Wraps the library's send-packet/receive-frame loop. Emission uses
//! ownership transfer: every received frame is a freshly allocated
//! container moved out to the consumer, never a cloned reference. On the
//! hardware path this is what returns each GPU surface to the pool as
//! soon as the video player is done with it; cloning here pins the pool
//! and starves the decoder of reference surfaces.

mod decoder;
mod error;

pub use decoder::{DecodedVideoFrame, VideoDecoder};
pub use error::{DecodeError, DecodeResult};
