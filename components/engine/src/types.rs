//! Host-supplied presentation hooks

use zenplay_hardware_accel::SharedGpuDevice;
use zenplay_renderer::{DisplaySurface, GpuPresentTarget, RenderResult, WindowHandle};

/// Builds the host's GPU draw target around the shared decode device
///
/// Invoked during `open`, after the hardware decoder context exists, so
/// the target samples surfaces of the same device. Returning an error
/// sends the render path to the software fallback.
pub trait GpuTargetFactory: Send {
    /// Creates the draw target
    fn create(&mut self, device: SharedGpuDevice) -> RenderResult<Box<dyn GpuPresentTarget>>;
}

impl<F> GpuTargetFactory for F
where
    F: FnMut(SharedGpuDevice) -> RenderResult<Box<dyn GpuPresentTarget>> + Send,
{
    fn create(&mut self, device: SharedGpuDevice) -> RenderResult<Box<dyn GpuPresentTarget>> {
        (self)(device)
    }
}

/// Everything the host hands over for video presentation
///
/// The display surface backs the software path; the optional GPU factory
/// enables the zero-copy path. Sources without video need none of this.
pub struct VideoOutputSetup {
    /// Native window to render into
    pub window: WindowHandle,
    /// Initial width in pixels
    pub width: u32,
    /// Initial height in pixels
    pub height: u32,
    /// CPU upload target for the software renderer
    pub display_surface: Box<dyn DisplaySurface>,
    /// GPU draw target factory for the hardware renderer
    pub gpu_target: Option<Box<dyn GpuTargetFactory>>,
}
