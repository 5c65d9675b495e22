//! Error types for audio decoding

use thiserror::Error;
use zenplay_shared_types::{AudioErrorKind, DecoderErrorKind, PlayerError};

/// Errors produced while decoding or resampling audio
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AudioDecodeError {
    /// Opening the codec context failed
    #[error("audio decoder initialization failed: {details}")]
    InitFailed {
        /// Library diagnostic
        details: String,
    },

    /// Submitting a packet failed
    #[error("audio send packet failed: {details}")]
    SendFailed {
        /// Library diagnostic
        details: String,
    },

    /// Receiving a frame failed
    #[error("audio receive frame failed: {details}")]
    ReceiveFailed {
        /// Library diagnostic
        details: String,
    },

    /// Converting samples to the output format failed
    #[error("resample failed: {details}")]
    ResampleFailed {
        /// Library diagnostic
        details: String,
    },
}

/// Result type for audio decoding operations
pub type AudioDecodeResult<T> = Result<T, AudioDecodeError>;

impl From<AudioDecodeError> for PlayerError {
    fn from(error: AudioDecodeError) -> Self {
        match &error {
            AudioDecodeError::ResampleFailed { .. } => PlayerError::Audio {
                kind: AudioErrorKind::ResampleFailed,
                details: error.to_string(),
            },
            AudioDecodeError::InitFailed { .. } => PlayerError::Decoder {
                kind: DecoderErrorKind::InitFailed,
                details: error.to_string(),
            },
            AudioDecodeError::SendFailed { .. } => PlayerError::Decoder {
                kind: DecoderErrorKind::SendPacketFailed,
                details: error.to_string(),
            },
            AudioDecodeError::ReceiveFailed { .. } => PlayerError::Decoder {
                kind: DecoderErrorKind::ReceiveFrameFailed,
                details: error.to_string(),
            },
        }
    }
}
