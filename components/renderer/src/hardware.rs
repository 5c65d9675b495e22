//! Hardware (zero-copy) renderer

use crate::api::{GpuPresentTarget, GpuSurfaceView, Renderer, WindowHandle};
use crate::error::{RenderError, RenderResult};
use std::os::raw::c_void;
use tracing::{debug, trace};
use zenplay_hardware_accel::SharedGpuDevice;
use zenplay_video_decoder::DecodedVideoFrame;

/// GPU sampling path
///
/// Holds the decode device shared from the hardware decoder context and
/// draws each frame's surface in place. Every frame is checked against
/// that device; surfaces from another device cannot be sampled and would
/// corrupt the swap chain.
pub struct HardwareRenderer {
    device: SharedGpuDevice,
    target: Box<dyn GpuPresentTarget>,
    initialized: bool,
}

impl HardwareRenderer {
    /// Creates a renderer sampling surfaces of `device`
    pub fn new(device: SharedGpuDevice, target: Box<dyn GpuPresentTarget>) -> Self {
        Self {
            device,
            target,
            initialized: false,
        }
    }

    fn surface_view(frame: &DecodedVideoFrame) -> GpuSurfaceView {
        // Surface handles ride in the frame's data pointers: the texture
        // object in plane 0, the array slice index in plane 1.
        unsafe {
            let raw = frame.frame.as_ptr();
            GpuSurfaceView {
                texture: (*raw).data[0] as *mut c_void,
                array_index: (*raw).data[1] as usize,
                width: frame.frame.width(),
                height: frame.frame.height(),
            }
        }
    }
}

impl Renderer for HardwareRenderer {
    fn init(&mut self, window: WindowHandle, width: u32, height: u32) -> RenderResult<()> {
        self.target.init(window, width, height)?;
        self.initialized = true;
        debug!(width, height, "hardware renderer initialized");
        Ok(())
    }

    fn render_frame(&mut self, frame: &DecodedVideoFrame) -> RenderResult<()> {
        if !self.initialized {
            return Err(RenderError::NotInitialized);
        }
        if !frame.is_hardware() {
            return Err(RenderError::NotASurface);
        }
        if !self.device.owns_frame(&frame.frame) {
            return Err(RenderError::WrongDevice);
        }

        let view = Self::surface_view(frame);
        trace!(pts_ms = frame.pts_ms, slice = view.array_index, "drawing surface");
        self.target.draw_surface(view)
    }

    fn present(&mut self) -> RenderResult<()> {
        self.target.present()
    }

    fn on_resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.target.resize(width, height);
        Ok(())
    }

    fn clear(&mut self) -> RenderResult<()> {
        self.target.clear();
        Ok(())
    }

    fn cleanup(&mut self) {
        self.initialized = false;
        debug!("hardware renderer cleaned up");
    }
}
