//! # renderer Component
//!
//! Frame presentation for the playback pipeline.
//!
//! Two renderer variants share one contract: the software renderer
//! converts decoded frames to RGBA on the CPU and uploads them; the
//! hardware renderer samples GPU decode surfaces in place, on the same
//! device the decoder allocated them from, so no pixel bytes cross the
//! CPU/GPU boundary.
//!
//! Native graphics APIs are single-threaded per device, so every call
//! funnels through [`RendererProxy`]: callers on the designated render
//! thread run inline, everyone else posts a task and blocks until it
//! completes.

mod api;
mod error;
mod hardware;
mod proxy;
mod software;

pub use api::{DisplaySurface, GpuPresentTarget, GpuSurfaceView, Renderer, WindowHandle};
pub use error::{RenderError, RenderResult};
pub use hardware::HardwareRenderer;
pub use proxy::{RenderThread, RendererProxy};
pub use software::SoftwareRenderer;
