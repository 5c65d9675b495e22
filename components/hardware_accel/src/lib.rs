//! # hardware_accel Component
//!
//! Hardware decode device and surface-pool lifecycle.
//!
//! A [`HwDecoderContext`] owns one GPU device for the duration of an open
//! file. It installs the format-selection callback on a decoder so the
//! surface pool is sized by the codec library itself after the sequence
//! header is parsed — the pool size depends on the GOP structure and is
//! not computable up front. The device handle is shared with the hardware
//! renderer through [`SharedGpuDevice`], which is what makes the
//! zero-copy path possible: decoder and renderer operate on surfaces of
//! the same device.

mod capabilities;
mod context;
mod error;

pub use capabilities::{select_backends, HwBackend};
pub use context::{HwDecoderContext, SharedGpuDevice, DEFAULT_EXTRA_SURFACES};
pub use error::{HwAccelError, HwAccelResult};
