//! Backend selection

use ffmpeg_next::ffi::AVHWDeviceType;
use zenplay_shared_types::RenderConfig;

/// A hardware decode backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwBackend {
    /// Direct3D 11 video acceleration (Windows)
    D3d11va,
    /// DXVA2 (Windows, legacy)
    Dxva2,
    /// VideoToolbox (macOS)
    VideoToolbox,
    /// VA-API (Linux)
    Vaapi,
}

impl HwBackend {
    /// Parses a backend from its configuration name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "d3d11va" => Some(HwBackend::D3d11va),
            "dxva2" => Some(HwBackend::Dxva2),
            "videotoolbox" => Some(HwBackend::VideoToolbox),
            "vaapi" => Some(HwBackend::Vaapi),
            _ => None,
        }
    }

    /// The configuration name of this backend
    pub fn name(self) -> &'static str {
        match self {
            HwBackend::D3d11va => "d3d11va",
            HwBackend::Dxva2 => "dxva2",
            HwBackend::VideoToolbox => "videotoolbox",
            HwBackend::Vaapi => "vaapi",
        }
    }

    /// The library's device type for this backend
    pub(crate) fn device_type(self) -> AVHWDeviceType {
        match self {
            HwBackend::D3d11va => AVHWDeviceType::AV_HWDEVICE_TYPE_D3D11VA,
            HwBackend::Dxva2 => AVHWDeviceType::AV_HWDEVICE_TYPE_DXVA2,
            HwBackend::VideoToolbox => AVHWDeviceType::AV_HWDEVICE_TYPE_VIDEOTOOLBOX,
            HwBackend::Vaapi => AVHWDeviceType::AV_HWDEVICE_TYPE_VAAPI,
        }
    }

    /// True when the running OS can host this backend at all
    pub fn available_on_host(self) -> bool {
        match self {
            HwBackend::D3d11va | HwBackend::Dxva2 => cfg!(target_os = "windows"),
            HwBackend::VideoToolbox => cfg!(target_os = "macos"),
            HwBackend::Vaapi => cfg!(target_os = "linux"),
        }
    }
}

/// Resolves the backend attempt order from configuration
///
/// Honors `render.backend_priority`, drops backends disabled by the
/// `render.hardware.allow_*` switches, and filters to what the host OS
/// can run. An empty result means the software path is the only option.
pub fn select_backends(render: &RenderConfig) -> Vec<HwBackend> {
    render
        .backend_priority
        .iter()
        .filter_map(|name| HwBackend::from_name(name))
        .filter(|backend| match backend {
            HwBackend::D3d11va => render.hardware.allow_d3d11va,
            HwBackend::Dxva2 => render.hardware.allow_dxva2,
            _ => true,
        })
        .filter(|backend| backend.available_on_host())
        .collect()
}
