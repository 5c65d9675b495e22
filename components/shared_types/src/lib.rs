//! # shared_types Component
//!
//! Common types used across all ZenPlay playback components.
//!
//! This crate provides the foundational definitions for the playback engine:
//!
//! - **State**: [`PlayerState`] and its transition table
//! - **Errors**: [`PlayerError`] covering every failure category
//! - **Formats**: [`AudioSpec`], [`TimeBase`] and timestamp helpers
//! - **Seeking**: [`SeekRequest`], [`SeekDirection`]
//! - **Configuration**: [`PlayerConfig`] consuming the dotted-path key set
//!
//! # Examples
//!
//! Validating a state transition:
//!
//! ```
//! use zenplay_shared_types::PlayerState;
//!
//! assert!(PlayerState::Playing.can_transition_to(PlayerState::Paused));
//! assert!(!PlayerState::Idle.can_transition_to(PlayerState::Playing));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// Module declarations
mod config;
mod errors;
mod formats;
mod seek;
mod state;

// Re-export public API
pub use config::*;
pub use errors::*;
pub use formats::*;
pub use seek::*;
pub use state::*;
