//! Error types for playback operations
//!
//! Every fallible operation in the engine resolves to [`PlayerError`] at
//! the facade boundary. Component crates define their own narrower enums
//! and convert into this one.

use thiserror::Error;

/// Sub-kind for I/O and container failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoErrorKind {
    /// The source could not be opened
    OpenFailed,
    /// No usable stream was found in the container
    StreamNotFound,
    /// The demuxer failed while reading
    DemuxFailed,
    /// End of stream reached before it was expected
    PrematureEof,
}

/// Sub-kind for decoder failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderErrorKind {
    /// No decoder exists for the codec id
    NotFound,
    /// The codec is known but not supported in this build
    UnsupportedCodec,
    /// Opening the codec context failed
    InitFailed,
    /// Submitting a packet failed
    SendPacketFailed,
    /// Receiving a frame failed
    ReceiveFrameFailed,
}

/// Sub-kind for audio output failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioErrorKind {
    /// The output device could not be initialized
    DeviceInitFailed,
    /// The negotiated format is not supported
    FormatNotSupported,
    /// Sample conversion failed
    ResampleFailed,
}

/// Sub-kind for network failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// The remote end refused the connection
    ConnectionRefused,
    /// The operation timed out
    Timeout,
    /// The URL could not be parsed or is unsupported
    InvalidUrl,
    /// The host is unreachable
    Unreachable,
}

/// Playback engine error taxonomy
///
/// Callers discover unrecoverable failures through the Error state, not
/// through panics; these values carry the diagnostic detail.
///
/// # Examples
///
/// ```
/// use zenplay_shared_types::{PlayerError, DecoderErrorKind};
///
/// let error = PlayerError::Decoder {
///     kind: DecoderErrorKind::InitFailed,
///     details: "h264 context rejected parameters".to_string(),
/// };
/// println!("{error}");
/// ```
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlayerError {
    /// The caller passed an invalid argument
    #[error("Invalid argument: {details}")]
    InvalidArgument {
        /// What was wrong with the argument
        details: String,
    },

    /// An operation was attempted before the component was initialized
    #[error("Not initialized: {details}")]
    NotInitialized {
        /// Which component was missing
        details: String,
    },

    /// An operation was attempted while another run was active
    #[error("Already running: {details}")]
    AlreadyRunning {
        /// What was already running
        details: String,
    },

    /// An invalid state transition was attempted
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// The current state name
        from: &'static str,
        /// The attempted target state name
        to: &'static str,
    },

    /// An I/O or container-level failure
    #[error("I/O error ({kind:?}): {details}")]
    Io {
        /// Failure sub-kind
        kind: IoErrorKind,
        /// Diagnostic detail
        details: String,
    },

    /// A decoder failure
    #[error("Decoder error ({kind:?}): {details}")]
    Decoder {
        /// Failure sub-kind
        kind: DecoderErrorKind,
        /// Diagnostic detail
        details: String,
    },

    /// An audio path failure
    #[error("Audio error ({kind:?}): {details}")]
    Audio {
        /// Failure sub-kind
        kind: AudioErrorKind,
        /// Diagnostic detail
        details: String,
    },

    /// A network failure
    #[error("Network error ({kind:?}): {details}")]
    Network {
        /// Failure sub-kind
        kind: NetworkErrorKind,
        /// Diagnostic detail
        details: String,
    },

    /// A hardware acceleration failure
    ///
    /// These surface to the caller only when fallback is not permitted;
    /// otherwise the software path is taken and the failure is logged.
    #[error("Hardware acceleration error: {details}")]
    HwAccel {
        /// Diagnostic detail
        details: String,
    },

    /// A renderer failure
    #[error("Render error: {details}")]
    Render {
        /// Diagnostic detail
        details: String,
    },

    /// Anything that does not fit another category
    #[error("Unknown error: {details}")]
    Unknown {
        /// Diagnostic detail
        details: String,
    },
}

impl PlayerError {
    /// Shorthand for an [`PlayerError::InvalidArgument`] value
    pub fn invalid_argument(details: impl Into<String>) -> Self {
        PlayerError::InvalidArgument {
            details: details.into(),
        }
    }

    /// Shorthand for an [`PlayerError::Unknown`] value
    pub fn unknown(details: impl Into<String>) -> Self {
        PlayerError::Unknown {
            details: details.into(),
        }
    }
}

/// Result type for playback operations
pub type PlayerResult<T> = Result<T, PlayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_detail() {
        let error = PlayerError::Io {
            kind: IoErrorKind::OpenFailed,
            details: "no such file".to_string(),
        };
        let text = error.to_string();
        assert!(text.contains("OpenFailed"));
        assert!(text.contains("no such file"));
    }

    #[test]
    fn test_transition_error_names_states() {
        let error = PlayerError::InvalidStateTransition {
            from: "Idle",
            to: "Playing",
        };
        assert_eq!(error.to_string(), "Invalid state transition: Idle -> Playing");
    }
}
