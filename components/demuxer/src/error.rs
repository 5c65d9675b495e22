//! Error types for demuxing operations

use thiserror::Error;
use zenplay_shared_types::{IoErrorKind, NetworkErrorKind, PlayerError};

/// Errors produced while opening or reading a source
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DemuxError {
    /// The source could not be opened
    #[error("failed to open source: {details}")]
    OpenFailed {
        /// Library diagnostic
        details: String,
    },

    /// The container holds neither a usable audio nor video stream
    #[error("no playable streams in source")]
    NoStreams,

    /// Reading the next packet failed
    #[error("packet read failed: {details}")]
    ReadFailed {
        /// Library diagnostic
        details: String,
    },

    /// Repositioning failed
    #[error("seek failed: {details}")]
    SeekFailed {
        /// Library diagnostic
        details: String,
    },
}

/// Result type for demuxing operations
pub type DemuxResult<T> = Result<T, DemuxError>;

impl From<DemuxError> for PlayerError {
    fn from(error: DemuxError) -> Self {
        match error {
            DemuxError::OpenFailed { details } => {
                // Connection-level failures read better as network errors.
                if details.contains("Connection refused") {
                    PlayerError::Network {
                        kind: NetworkErrorKind::ConnectionRefused,
                        details,
                    }
                } else if details.contains("timed out") || details.contains("Timeout") {
                    PlayerError::Network {
                        kind: NetworkErrorKind::Timeout,
                        details,
                    }
                } else {
                    PlayerError::Io {
                        kind: IoErrorKind::OpenFailed,
                        details,
                    }
                }
            }
            DemuxError::NoStreams => PlayerError::Io {
                kind: IoErrorKind::StreamNotFound,
                details: "no playable streams".to_string(),
            },
            DemuxError::ReadFailed { details } | DemuxError::SeekFailed { details } => {
                PlayerError::Io {
                    kind: IoErrorKind::DemuxFailed,
                    details,
                }
            }
        }
    }
}
