//! Error types for hardware acceleration

use thiserror::Error;
use zenplay_shared_types::PlayerError;

/// Hardware acceleration errors
///
/// When fallback is permitted these never reach the caller; the engine
/// logs them and takes the software path instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HwAccelError {
    /// No permitted backend exists on this host
    #[error("no hardware backend available")]
    NotAvailable,

    /// The named backend is unknown
    #[error("unknown hardware backend: {0}")]
    UnknownBackend(String),

    /// Creating the hardware device failed
    #[error("hardware device creation failed for {backend}: code {code}")]
    DeviceCreateFailed {
        /// Backend name
        backend: &'static str,
        /// Library error code
        code: i32,
    },

    /// Initializing the frames context (surface pool) failed
    #[error("hardware frame pool initialization failed: code {code}")]
    FramesInitFailed {
        /// Library error code
        code: i32,
    },
}

/// Result type for hardware acceleration operations
pub type HwAccelResult<T> = Result<T, HwAccelError>;

impl From<HwAccelError> for PlayerError {
    fn from(error: HwAccelError) -> Self {
        PlayerError::HwAccel {
            details: error.to_string(),
        }
    }
}
