//! Error types for decoding operations

use thiserror::Error;
use zenplay_shared_types::{DecoderErrorKind, PlayerError};

/// Errors produced while constructing or driving a decoder
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecodeError {
    /// No decoder exists for the stream's codec
    #[error("decoder not found for codec {codec}")]
    NotFound {
        /// Codec name
        codec: String,
    },

    /// Opening the codec context failed
    #[error("decoder initialization failed: {details}")]
    InitFailed {
        /// Library diagnostic
        details: String,
    },

    /// Submitting a packet failed
    #[error("send packet failed: {details}")]
    SendFailed {
        /// Library diagnostic
        details: String,
    },

    /// Receiving a frame failed
    #[error("receive frame failed: {details}")]
    ReceiveFailed {
        /// Library diagnostic
        details: String,
    },
}

/// Result type for decoding operations
pub type DecodeResult<T> = Result<T, DecodeError>;

impl From<DecodeError> for PlayerError {
    fn from(error: DecodeError) -> Self {
        let kind = match &error {
            DecodeError::NotFound { .. } => DecoderErrorKind::NotFound,
            DecodeError::InitFailed { .. } => DecoderErrorKind::InitFailed,
            DecodeError::SendFailed { .. } => DecoderErrorKind::SendPacketFailed,
            DecodeError::ReceiveFailed { .. } => DecoderErrorKind::ReceiveFrameFailed,
        };
        PlayerError::Decoder {
            kind,
            details: error.to_string(),
        }
    }
}
