//! Hardware device and frames-context lifecycle

use crate::capabilities::HwBackend;
use crate::error::{HwAccelError, HwAccelResult};
use ffmpeg_next as ffmpeg;
use ffmpeg::ffi::{
    av_buffer_ref, av_buffer_unref, av_hwdevice_ctx_create, av_hwframe_ctx_init,
    avcodec_get_hw_frames_parameters, AVBufferRef, AVCodecContext, AVHWFramesContext,
    AVPixelFormat,
};
use std::os::raw::{c_int, c_void};
use std::ptr;
use tracing::{debug, info, warn};

/// Extra surfaces added on top of the library-computed pool size.
///
/// Cushions scheduling latency between decode and render without
/// touching the pool-size derivation itself.
pub const DEFAULT_EXTRA_SURFACES: u32 = 6;

/// State read by the format-selection callback.
///
/// Owned by the [`HwDecoderContext`], referenced from the codec context's
/// opaque pointer; the context must outlive every decoder it is attached
/// to.
struct CallbackState {
    hw_pix_fmt: AVPixelFormat,
    extra_surfaces: i32,
}

/// A ref-counted handle to the decode device, shared with the renderer
///
/// Cloning takes another reference on the underlying device buffer; the
/// device itself is freed when the last clone drops.
pub struct SharedGpuDevice {
    buffer: *mut AVBufferRef,
}

// The device buffer is reference-counted with atomic ops inside the
// library; the handle itself carries no interior state.
unsafe impl Send for SharedGpuDevice {}
unsafe impl Sync for SharedGpuDevice {}

impl SharedGpuDevice {
    /// Raw device buffer for backend draw code
    pub fn as_ptr(&self) -> *mut AVBufferRef {
        self.buffer
    }

    /// True when `frame` carries a surface allocated on this device
    pub fn owns_frame(&self, frame: &ffmpeg::frame::Video) -> bool {
        unsafe {
            let frames_ref = (*frame.as_ptr()).hw_frames_ctx;
            if frames_ref.is_null() {
                return false;
            }
            let frames_ctx = (*frames_ref).data as *const AVHWFramesContext;
            let device_ref = (*frames_ctx).device_ref;
            !device_ref.is_null() && (*device_ref).data == (*self.buffer).data
        }
    }
}

impl Clone for SharedGpuDevice {
    fn clone(&self) -> Self {
        Self {
            buffer: unsafe { av_buffer_ref(self.buffer) },
        }
    }
}

impl Drop for SharedGpuDevice {
    fn drop(&mut self) {
        unsafe { av_buffer_unref(&mut self.buffer) };
    }
}

/// Owns the hardware decode device for one open file
///
/// Construction allocates the device; attaching to a decoder installs the
/// format-selection callback that builds the surface pool. The pool size
/// is produced by the library's own parameter helper inside that
/// callback — after the sequence header is parsed — because the required
/// size depends on reference/B-frame structure that is unknown earlier.
/// Deriving it by hand at that point produces a pool that exhausts at the
/// first B-frame burst.
pub struct HwDecoderContext {
    device: *mut AVBufferRef,
    backend: HwBackend,
    state: Box<CallbackState>,
}

unsafe impl Send for HwDecoderContext {}

impl HwDecoderContext {
    /// Creates the device for `backend`
    ///
    /// # Errors
    ///
    /// Returns [`HwAccelError::DeviceCreateFailed`] when the driver
    /// rejects device creation.
    pub fn new(backend: HwBackend, extra_surfaces: u32) -> HwAccelResult<Self> {
        let mut device: *mut AVBufferRef = ptr::null_mut();
        let code = unsafe {
            av_hwdevice_ctx_create(
                &mut device,
                backend.device_type(),
                ptr::null(),
                ptr::null_mut(),
                0,
            )
        };
        if code < 0 {
            warn!(backend = backend.name(), code, "hardware device creation failed");
            return Err(HwAccelError::DeviceCreateFailed {
                backend: backend.name(),
                code,
            });
        }

        info!(backend = backend.name(), "hardware decode device created");
        Ok(Self {
            device,
            backend,
            state: Box::new(CallbackState {
                hw_pix_fmt: hw_pixel_format(backend),
                extra_surfaces: extra_surfaces as i32,
            }),
        })
    }

    /// The backend this device was created for
    pub fn backend(&self) -> HwBackend {
        self.backend
    }

    /// The hardware pixel format frames will arrive in
    pub fn pixel_format(&self) -> AVPixelFormat {
        self.state.hw_pix_fmt
    }

    /// Takes a shared handle for the renderer
    pub fn share_device(&self) -> SharedGpuDevice {
        SharedGpuDevice {
            buffer: unsafe { av_buffer_ref(self.device) },
        }
    }

    /// Wires this device into an unopened codec context
    ///
    /// Must run before the codec is opened so the format-selection
    /// callback participates in the open. The context must outlive the
    /// decoder.
    ///
    /// # Safety
    ///
    /// `codec_ctx` must be a valid, not-yet-opened codec context.
    pub unsafe fn attach_to(&self, codec_ctx: *mut AVCodecContext) {
        (*codec_ctx).hw_device_ctx = av_buffer_ref(self.device);
        (*codec_ctx).opaque = self.state.as_ref() as *const CallbackState as *mut c_void;
        (*codec_ctx).get_format = Some(hw_get_format);
        debug!(backend = self.backend.name(), "hardware context attached to decoder");
    }
}

impl Drop for HwDecoderContext {
    fn drop(&mut self) {
        unsafe { av_buffer_unref(&mut self.device) };
    }
}

fn hw_pixel_format(backend: HwBackend) -> AVPixelFormat {
    match backend {
        HwBackend::D3d11va => AVPixelFormat::AV_PIX_FMT_D3D11,
        HwBackend::Dxva2 => AVPixelFormat::AV_PIX_FMT_DXVA2_VLD,
        HwBackend::VideoToolbox => AVPixelFormat::AV_PIX_FMT_VIDEOTOOLBOX,
        HwBackend::Vaapi => AVPixelFormat::AV_PIX_FMT_VAAPI,
    }
}

/// Format-selection callback installed on hardware-attached decoders.
///
/// Invoked by the library while opening the codec, after the sequence
/// header parse. Builds the frames context here, where
/// `avcodec_get_hw_frames_parameters` can compute a correct
/// `initial_pool_size`; falls back to the first offered software format
/// when pool construction fails.
unsafe extern "C" fn hw_get_format(
    codec_ctx: *mut AVCodecContext,
    formats: *const AVPixelFormat,
) -> AVPixelFormat {
    let state = &*((*codec_ctx).opaque as *const CallbackState);

    let mut cursor = formats;
    while *cursor != AVPixelFormat::AV_PIX_FMT_NONE {
        if *cursor == state.hw_pix_fmt {
            if init_hw_frames(codec_ctx, state) == 0 {
                return state.hw_pix_fmt;
            }
            break;
        }
        cursor = cursor.add(1);
    }

    warn!("hardware format unavailable, decoder falling back to software output");
    *formats
}

unsafe fn init_hw_frames(codec_ctx: *mut AVCodecContext, state: &CallbackState) -> c_int {
    let mut frames_ref: *mut AVBufferRef = ptr::null_mut();
    let code = avcodec_get_hw_frames_parameters(
        codec_ctx,
        (*codec_ctx).hw_device_ctx,
        state.hw_pix_fmt,
        &mut frames_ref,
    );
    if code < 0 {
        warn!(code, "hardware frame parameters unavailable");
        return code;
    }

    let frames_ctx = (*frames_ref).data as *mut AVHWFramesContext;
    (*frames_ctx).initial_pool_size += state.extra_surfaces;

    // Let the renderer sample decode surfaces directly.
    #[cfg(target_os = "windows")]
    if (*frames_ctx).format == AVPixelFormat::AV_PIX_FMT_D3D11 {
        use ffmpeg::ffi::AVD3D11VAFramesContext;
        const D3D11_BIND_SHADER_RESOURCE: u32 = 0x8;
        let d3d11 = (*frames_ctx).hwctx as *mut AVD3D11VAFramesContext;
        (*d3d11).BindFlags |= D3D11_BIND_SHADER_RESOURCE;
    }

    let code = av_hwframe_ctx_init(frames_ref);
    if code < 0 {
        warn!(code, "hardware frame pool initialization failed");
        av_buffer_unref(&mut frames_ref);
        return code;
    }

    debug!(
        pool_size = (*frames_ctx).initial_pool_size,
        "hardware frame pool ready"
    );
    (*codec_ctx).hw_frames_ctx = frames_ref;
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hw_pixel_format_per_backend() {
        assert_eq!(
            hw_pixel_format(HwBackend::D3d11va),
            AVPixelFormat::AV_PIX_FMT_D3D11
        );
        assert_eq!(
            hw_pixel_format(HwBackend::Vaapi),
            AVPixelFormat::AV_PIX_FMT_VAAPI
        );
    }

    #[test]
    fn test_device_creation_does_not_panic() {
        // Hardware is usually absent in CI; both outcomes are fine, the
        // call must simply not crash.
        for backend in [HwBackend::Vaapi, HwBackend::VideoToolbox, HwBackend::D3d11va] {
            if !backend.available_on_host() {
                continue;
            }
            match HwDecoderContext::new(backend, DEFAULT_EXTRA_SURFACES) {
                Ok(context) => {
                    let device = context.share_device();
                    let _second = device.clone();
                }
                Err(HwAccelError::DeviceCreateFailed { .. }) => {}
                Err(error) => panic!("unexpected error: {error:?}"),
            }
        }
    }
}
