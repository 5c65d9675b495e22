//! Renderer contracts

use crate::error::RenderResult;
use std::os::raw::c_void;
use zenplay_video_decoder::DecodedVideoFrame;

/// A native window handle supplied by the host application
///
/// Opaque to the core; only the host's presentation target interprets
/// it.
#[derive(Debug, Clone, Copy)]
pub struct WindowHandle(pub *mut c_void);

// The handle is only dereferenced by the host's presentation code on the
// render thread; carrying it there is safe.
unsafe impl Send for WindowHandle {}

/// CPU upload target supplied by the host for the software path
///
/// The host owns the actual texture/swap-chain plumbing; the renderer
/// hands it finished RGBA pixels.
pub trait DisplaySurface: Send {
    /// Binds the surface to a window at an initial size
    fn init(&mut self, window: WindowHandle, width: u32, height: u32) -> RenderResult<()>;

    /// Uploads one RGBA frame; `stride` is the source row length in bytes
    fn upload_rgba(&mut self, width: u32, height: u32, stride: usize, pixels: &[u8])
        -> RenderResult<()>;

    /// Flips the uploaded frame to the screen
    fn present(&mut self) -> RenderResult<()>;

    /// Adjusts to a new window size
    fn resize(&mut self, width: u32, height: u32);

    /// Blanks the output
    fn clear(&mut self);
}

/// A sampleable view of one GPU decode surface
///
/// On D3D11 the texture is an array texture and `array_index` selects
/// the slice holding this frame.
#[derive(Debug, Clone, Copy)]
pub struct GpuSurfaceView {
    /// Backend texture object
    pub texture: *mut c_void,
    /// Array slice within the texture
    pub array_index: usize,
    /// Surface width in pixels
    pub width: u32,
    /// Surface height in pixels
    pub height: u32,
}

unsafe impl Send for GpuSurfaceView {}

/// GPU draw target supplied by the host for the zero-copy path
///
/// Constructed by the host around the shared decode device; draws a
/// full-screen quad sampling the surface through a YUV-to-RGB shader.
pub trait GpuPresentTarget: Send {
    /// Binds the target to a window at an initial size
    fn init(&mut self, window: WindowHandle, width: u32, height: u32) -> RenderResult<()>;

    /// Draws one decode surface; no pixel data crosses the CPU boundary
    fn draw_surface(&mut self, view: GpuSurfaceView) -> RenderResult<()>;

    /// Flips the drawn frame to the screen
    fn present(&mut self) -> RenderResult<()>;

    /// Adjusts to a new window size
    fn resize(&mut self, width: u32, height: u32);

    /// Blanks the output
    fn clear(&mut self);
}

/// Common renderer contract, always driven through the proxy
pub trait Renderer: Send {
    /// Binds the renderer to a window
    fn init(&mut self, window: WindowHandle, width: u32, height: u32) -> RenderResult<()>;

    /// Draws one decoded frame
    fn render_frame(&mut self, frame: &DecodedVideoFrame) -> RenderResult<()>;

    /// Flips the drawn frame to the screen
    fn present(&mut self) -> RenderResult<()>;

    /// Adjusts to a new window size
    fn on_resize(&mut self, width: u32, height: u32) -> RenderResult<()>;

    /// Blanks the output
    fn clear(&mut self) -> RenderResult<()>;

    /// Releases backend resources
    fn cleanup(&mut self);
}
