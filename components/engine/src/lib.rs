//! # engine Component
//!
//! The public playback facade.
//!
//! [`ZenPlayer`] owns the lifetime of every pipeline component: open
//! wires the demuxer, decoders, players, sync controller, and render
//! path together; close tears them down and joins every worker. Hosts
//! observe progress through the state-change callbacks and
//! [`ZenPlayer::current_time_ms`].

mod engine;
mod types;

pub use engine::ZenPlayer;
pub use types::{GpuTargetFactory, VideoOutputSetup};
