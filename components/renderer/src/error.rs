//! Error types for rendering

use thiserror::Error;
use zenplay_shared_types::PlayerError;

/// Errors produced by renderer operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RenderError {
    /// Renderer used before `init`
    #[error("renderer is not initialized")]
    NotInitialized,

    /// Renderer initialization failed
    #[error("renderer initialization failed: {details}")]
    InitFailed {
        /// Backend diagnostic
        details: String,
    },

    /// A frame arrived carrying a surface from a different GPU device
    #[error("frame surface does not belong to the shared device")]
    WrongDevice,

    /// A software frame arrived at the hardware renderer
    #[error("hardware renderer received a non-surface frame")]
    NotASurface,

    /// Pixel conversion or upload failed
    #[error("frame upload failed: {details}")]
    UploadFailed {
        /// Backend diagnostic
        details: String,
    },

    /// The render thread is no longer running
    #[error("render thread is gone")]
    ThreadGone,
}

/// Result type for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;

impl From<RenderError> for PlayerError {
    fn from(error: RenderError) -> Self {
        PlayerError::Render {
            details: error.to_string(),
        }
    }
}
