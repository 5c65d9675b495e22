//! Typed configuration consumed from the external key/value store
//!
//! The configuration collaborator persists dotted-path keys as JSON. The
//! engine reads a snapshot at open time; unrecognized keys are ignored and
//! missing keys keep the documented defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Master clock selection method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMethod {
    /// Audio stream position is the master (default when audio exists)
    #[default]
    Audio,
    /// Video stream position is the master
    Video,
    /// Wall clock from play start is the master
    External,
}

/// Hardware backend switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareConfig {
    /// Allow the D3D11VA backend
    pub allow_d3d11va: bool,
    /// Allow the DXVA2 backend
    pub allow_dxva2: bool,
    /// Allow falling back to software decode when hardware init fails
    pub allow_fallback: bool,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            allow_d3d11va: true,
            allow_dxva2: true,
            allow_fallback: true,
        }
    }
}

/// Render path configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Try hardware decode/render before software
    pub use_hardware_acceleration: bool,
    /// Hardware backend switches
    pub hardware: HardwareConfig,
    /// Backend names in preference order
    pub backend_priority: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            use_hardware_acceleration: true,
            hardware: HardwareConfig::default(),
            backend_priority: vec![
                "d3d11va".to_string(),
                "dxva2".to_string(),
                "videotoolbox".to_string(),
                "vaapi".to_string(),
            ],
        }
    }
}

/// Audio path configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Device buffer size in sample frames
    pub buffer_size: u32,
    /// Preferred sample rate in Hz
    pub sample_rate: u32,
    /// Preferred channel count
    pub channels: u16,
    /// Output volume, 0.0 to 1.0
    pub volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            buffer_size: 4096,
            sample_rate: 48_000,
            channels: 2,
            volume: 1.0,
        }
    }
}

/// Video path configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Decoder names to try before the stream default
    pub decoder_priority: Vec<String>,
}

/// Synchronization configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Master clock method
    pub method: SyncMethod,
    /// Late-frame drop threshold in milliseconds
    pub correction_threshold_ms: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            method: SyncMethod::Audio,
            correction_threshold_ms: 100,
        }
    }
}

/// Network configuration applied to protocol opens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Read timeout in milliseconds
    pub timeout_ms: u64,
    /// Socket buffer size in KiB
    pub buffer_size_kb: u64,
    /// User-agent string sent on HTTP opens
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            buffer_size_kb: 10 * 1024,
            user_agent: "ZenPlay/0.1".to_string(),
        }
    }
}

/// Complete engine configuration
///
/// # Examples
///
/// ```
/// use zenplay_shared_types::PlayerConfig;
/// use serde_json::json;
///
/// let snapshot = json!({
///     "render.use_hardware_acceleration": false,
///     "player.audio.volume": 0.5,
///     "some.unknown.key": 42,
/// });
/// let config = PlayerConfig::from_snapshot(&snapshot);
/// assert!(!config.render.use_hardware_acceleration);
/// assert_eq!(config.audio.volume, 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Render path settings
    pub render: RenderConfig,
    /// Audio path settings
    pub audio: AudioConfig,
    /// Video path settings
    pub video: VideoConfig,
    /// Synchronization settings
    pub sync: SyncConfig,
    /// Network open settings
    pub network: NetworkConfig,
    /// Log level name (consumed by the host's logging setup)
    pub log_level: Option<String>,
}

impl PlayerConfig {
    /// Builds a configuration from a JSON object of dotted-path keys
    ///
    /// Unrecognized keys and values of the wrong type are ignored.
    pub fn from_snapshot(snapshot: &Value) -> Self {
        let mut config = Self::default();
        if let Some(map) = snapshot.as_object() {
            for (key, value) in map {
                config.apply(key, value);
            }
        }
        config
    }

    /// Applies a single dotted-path key
    pub fn apply(&mut self, key: &str, value: &Value) {
        match key {
            "render.use_hardware_acceleration" => {
                set_bool(&mut self.render.use_hardware_acceleration, value)
            }
            "render.hardware.allow_d3d11va" => {
                set_bool(&mut self.render.hardware.allow_d3d11va, value)
            }
            "render.hardware.allow_dxva2" => {
                set_bool(&mut self.render.hardware.allow_dxva2, value)
            }
            "render.hardware.allow_fallback" => {
                set_bool(&mut self.render.hardware.allow_fallback, value)
            }
            "render.backend_priority" => set_string_list(&mut self.render.backend_priority, value),
            "player.audio.buffer_size" => set_u32(&mut self.audio.buffer_size, value),
            "player.audio.sample_rate" => set_u32(&mut self.audio.sample_rate, value),
            "player.audio.channels" => {
                if let Some(n) = value.as_u64() {
                    if n > 0 && n <= u16::MAX as u64 {
                        self.audio.channels = n as u16;
                    }
                }
            }
            "player.audio.volume" => {
                if let Some(v) = value.as_f64() {
                    self.audio.volume = v.clamp(0.0, 1.0) as f32;
                }
            }
            "player.video.decoder_priority" => {
                set_string_list(&mut self.video.decoder_priority, value)
            }
            "player.sync.method" => {
                if let Some(name) = value.as_str() {
                    match name {
                        "audio" => self.sync.method = SyncMethod::Audio,
                        "video" => self.sync.method = SyncMethod::Video,
                        "external" => self.sync.method = SyncMethod::External,
                        _ => {}
                    }
                }
            }
            "player.sync.correction_threshold_ms" => {
                if let Some(n) = value.as_i64() {
                    if n > 0 {
                        self.sync.correction_threshold_ms = n;
                    }
                }
            }
            "network.timeout_ms" => set_u64(&mut self.network.timeout_ms, value),
            "network.buffer_size_kb" => set_u64(&mut self.network.buffer_size_kb, value),
            "network.user_agent" => {
                if let Some(s) = value.as_str() {
                    self.network.user_agent = s.to_string();
                }
            }
            "log.level" => {
                if let Some(s) = value.as_str() {
                    self.log_level = Some(s.to_string());
                }
            }
            _ => {}
        }
    }
}

fn set_bool(slot: &mut bool, value: &Value) {
    if let Some(b) = value.as_bool() {
        *slot = b;
    }
}

fn set_u32(slot: &mut u32, value: &Value) {
    if let Some(n) = value.as_u64() {
        if n > 0 && n <= u32::MAX as u64 {
            *slot = n as u32;
        }
    }
}

fn set_u64(slot: &mut u64, value: &Value) {
    if let Some(n) = value.as_u64() {
        if n > 0 {
            *slot = n;
        }
    }
}

fn set_string_list(slot: &mut Vec<String>, value: &Value) {
    if let Some(items) = value.as_array() {
        let names: Vec<String> = items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        if !names.is_empty() {
            *slot = names;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert!(config.render.use_hardware_acceleration);
        assert_eq!(config.audio.sample_rate, 48_000);
        assert_eq!(config.sync.method, SyncMethod::Audio);
        assert_eq!(config.sync.correction_threshold_ms, 100);
        assert_eq!(config.network.timeout_ms, 2000);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let snapshot = json!({
            "render.use_hardware_acceleration": false,
            "render.backend_priority": ["vaapi"],
            "player.audio.sample_rate": 44_100,
            "player.sync.method": "external",
            "network.user_agent": "test-agent",
            "log.level": "debug",
        });
        let config = PlayerConfig::from_snapshot(&snapshot);
        assert!(!config.render.use_hardware_acceleration);
        assert_eq!(config.render.backend_priority, vec!["vaapi".to_string()]);
        assert_eq!(config.audio.sample_rate, 44_100);
        assert_eq!(config.sync.method, SyncMethod::External);
        assert_eq!(config.network.user_agent, "test-agent");
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_unrecognized_and_malformed_keys_ignored() {
        let snapshot = json!({
            "totally.unknown": true,
            "player.audio.volume": "loud",
            "player.audio.channels": 0,
        });
        let config = PlayerConfig::from_snapshot(&snapshot);
        assert_eq!(config, PlayerConfig::default());
    }

    #[test]
    fn test_volume_clamped() {
        let snapshot = json!({ "player.audio.volume": 3.5 });
        let config = PlayerConfig::from_snapshot(&snapshot);
        assert_eq!(config.audio.volume, 1.0);
    }
}
