//! # player_state Component
//!
//! Single source of truth for the playback state.
//!
//! The [`StateManager`] validates every transition against the fixed
//! table in `zenplay-shared_types`, notifies registered observers
//! synchronously, and provides the wait-for-resume primitive every
//! pipeline worker parks on while the player is paused or seeking.

mod manager;

pub use manager::{CallbackId, StateManager};
