//! Software renderer

use crate::api::{DisplaySurface, Renderer, WindowHandle};
use crate::error::{RenderError, RenderResult};
use ffmpeg_next as ffmpeg;
use ffmpeg::ffi::av_hwframe_transfer_data;
use ffmpeg::format::Pixel;
use ffmpeg::frame::Video;
use ffmpeg::software::scaling::{Context as Scaler, Flags};
use tracing::{debug, trace};
use zenplay_video_decoder::DecodedVideoFrame;

/// CPU conversion and upload path
///
/// Converts each decoded frame to RGBA with the library's scaler and
/// hands the pixels to the host's display surface. A hardware frame that
/// lands here (renderer fallback with hardware decode still active) is
/// first downloaded to system memory.
pub struct SoftwareRenderer {
    target: Box<dyn DisplaySurface>,
    scaler: Option<Scaler>,
    output_width: u32,
    output_height: u32,
    initialized: bool,
}

impl SoftwareRenderer {
    /// Creates a renderer drawing into `target`
    pub fn new(target: Box<dyn DisplaySurface>) -> Self {
        Self {
            target,
            scaler: None,
            output_width: 0,
            output_height: 0,
            initialized: false,
        }
    }

    fn scale_to_rgba(&mut self, frame: &Video) -> RenderResult<Video> {
        let (width, height) = (frame.width(), frame.height());

        // The scaler is format- and size-specific; rebuild lazily when
        // either changes.
        let rebuild = match &self.scaler {
            Some(scaler) => {
                scaler.input().width != width
                    || scaler.input().height != height
                    || scaler.input().format != frame.format()
            }
            None => true,
        };
        if rebuild {
            debug!(width, height, format = ?frame.format(), "building RGBA scaler");
            self.scaler = Some(
                Scaler::get(
                    frame.format(),
                    width,
                    height,
                    Pixel::RGBA,
                    width,
                    height,
                    Flags::BILINEAR,
                )
                .map_err(|error| RenderError::UploadFailed {
                    details: error.to_string(),
                })?,
            );
        }

        let mut rgba = Video::empty();
        self.scaler
            .as_mut()
            .expect("scaler built above")
            .run(frame, &mut rgba)
            .map_err(|error| RenderError::UploadFailed {
                details: error.to_string(),
            })?;
        Ok(rgba)
    }
}

impl Renderer for SoftwareRenderer {
    fn init(&mut self, window: WindowHandle, width: u32, height: u32) -> RenderResult<()> {
        self.target.init(window, width, height)?;
        self.output_width = width;
        self.output_height = height;
        self.initialized = true;
        debug!(width, height, "software renderer initialized");
        Ok(())
    }

    fn render_frame(&mut self, frame: &DecodedVideoFrame) -> RenderResult<()> {
        if !self.initialized {
            return Err(RenderError::NotInitialized);
        }

        let rgba = if frame.is_hardware() {
            // Download the surface; this path only runs when the
            // hardware renderer could not be built.
            let mut sw_frame = Video::empty();
            let code =
                unsafe { av_hwframe_transfer_data(sw_frame.as_mut_ptr(), frame.frame.as_ptr(), 0) };
            if code < 0 {
                return Err(RenderError::UploadFailed {
                    details: format!("surface download failed: code {code}"),
                });
            }
            self.scale_to_rgba(&sw_frame)?
        } else {
            self.scale_to_rgba(&frame.frame)?
        };

        trace!(pts_ms = frame.pts_ms, "uploading frame");
        self.target.upload_rgba(
            rgba.width(),
            rgba.height(),
            rgba.stride(0),
            rgba.data(0),
        )
    }

    fn present(&mut self) -> RenderResult<()> {
        self.target.present()
    }

    fn on_resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.output_width = width;
        self.output_height = height;
        self.target.resize(width, height);
        Ok(())
    }

    fn clear(&mut self) -> RenderResult<()> {
        self.target.clear();
        Ok(())
    }

    fn cleanup(&mut self) {
        self.scaler = None;
        self.initialized = false;
        debug!("software renderer cleaned up");
    }
}
