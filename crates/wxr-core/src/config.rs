use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level runtime configuration, loaded from wxr.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub runtime: RuntimeSection,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub swapchain: SwapchainConfig,
    #[serde(default)]
    pub frame: FrameConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSection {
    /// Name reported through xrGetInstanceProperties
    #[serde(default = "default_runtime_name")]
    pub name: String,
    /// Presentation backend driving the display
    #[serde(default)]
    pub backend: BackendKind,
    /// Log filter used when WXR_LOG is unset, e.g. "debug" or "wxr_runtime=trace"
    #[serde(default)]
    pub log_level: Option<String>,
}

/// Presentation backend selection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum BackendKind {
    /// Simulated display with a fixed standing head pose
    #[default]
    #[serde(rename = "headless")]
    Headless,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Native refresh rate of the display
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate_hz: f32,
    /// Recommended per-eye image width
    #[serde(default = "default_view_width")]
    pub view_width: u32,
    /// Recommended per-eye image height
    #[serde(default = "default_view_height")]
    pub view_height: u32,
    /// Largest swapchain image the compositor accepts
    #[serde(default = "default_max_image_size")]
    pub max_image_width: u32,
    #[serde(default = "default_max_image_size")]
    pub max_image_height: u32,
    #[serde(default = "default_max_layers")]
    pub max_layer_count: u32,
    #[serde(default = "default_max_samples")]
    pub max_sample_count: u32,
    /// Advertise ALPHA_BLEND in addition to OPAQUE (passthrough displays)
    #[serde(default)]
    pub alpha_blend: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapchainConfig {
    /// Images allocated per swapchain
    #[serde(default = "default_image_count")]
    pub image_count: u32,
    /// How many images the application may hold acquired or waited at once
    #[serde(default = "default_queue_depth")]
    pub queue_depth: u32,
    /// What xrAcquireSwapchainImage does when the next image is still with the compositor
    #[serde(default)]
    pub exhausted_policy: ExhaustedPolicy,
    /// Upper bound for a blocking acquire
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

/// Behaviour when the round-robin cursor lands on an image that is not free.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExhaustedPolicy {
    /// Return XR_ERROR_CALL_ORDER_INVALID immediately
    #[default]
    #[serde(rename = "fail")]
    Fail,
    /// Wait for the compositor to give the image back
    #[serde(rename = "block")]
    Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Ceiling for the period multiplier applied after missed frames
    #[serde(default = "default_max_pressure")]
    pub max_pressure: u32,
    /// Display periods between a frame boundary and the predicted display time
    #[serde(default = "default_latency_frames")]
    pub latency_frames: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Height of the LOCAL origin above the STAGE floor, metres
    #[serde(default = "default_eye_height")]
    pub eye_height_m: f32,
    /// Inter-pupillary distance, metres
    #[serde(default = "default_ipd")]
    pub ipd_m: f32,
    /// Symmetric half field of view per eye, degrees
    #[serde(default = "default_half_fov")]
    pub half_fov_deg: f32,
    /// Stage bounds; zero disables STAGE bounds reporting
    #[serde(default = "default_stage_extent")]
    pub stage_width_m: f32,
    #[serde(default = "default_stage_extent")]
    pub stage_depth_m: f32,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            name: default_runtime_name(),
            backend: BackendKind::default(),
            log_level: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: default_refresh_rate(),
            view_width: default_view_width(),
            view_height: default_view_height(),
            max_image_width: default_max_image_size(),
            max_image_height: default_max_image_size(),
            max_layer_count: default_max_layers(),
            max_sample_count: default_max_samples(),
            alpha_blend: false,
        }
    }
}

impl Default for SwapchainConfig {
    fn default() -> Self {
        Self {
            image_count: default_image_count(),
            queue_depth: default_queue_depth(),
            exhausted_policy: ExhaustedPolicy::default(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_pressure: default_max_pressure(),
            latency_frames: default_latency_frames(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            eye_height_m: default_eye_height(),
            ipd_m: default_ipd(),
            half_fov_deg: default_half_fov(),
            stage_width_m: default_stage_extent(),
            stage_depth_m: default_stage_extent(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file if it exists and is valid, otherwise return defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::Io(_)) => Self::default(),
            Err(e) => {
                tracing::warn!("ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Reject values the runtime cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display.refresh_rate_hz.is_nan() || self.display.refresh_rate_hz <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "display.refresh_rate_hz must be positive, got {}",
                self.display.refresh_rate_hz
            )));
        }
        if self.display.view_width == 0 || self.display.view_height == 0 {
            return Err(ConfigError::Invalid("display view size must be non-zero".into()));
        }
        if self.display.view_width > self.display.max_image_width
            || self.display.view_height > self.display.max_image_height
        {
            return Err(ConfigError::Invalid(
                "display view size exceeds the maximum image size".into(),
            ));
        }
        if self.display.max_layer_count == 0 || self.display.max_sample_count == 0 {
            return Err(ConfigError::Invalid(
                "display.max_layer_count and display.max_sample_count must be non-zero".into(),
            ));
        }
        if self.swapchain.image_count < 2 {
            return Err(ConfigError::Invalid(format!(
                "swapchain.image_count must be at least 2, got {}",
                self.swapchain.image_count
            )));
        }
        if self.swapchain.queue_depth == 0
            || self.swapchain.queue_depth >= self.swapchain.image_count
        {
            return Err(ConfigError::Invalid(format!(
                "swapchain.queue_depth must be in 1..{}, got {}",
                self.swapchain.image_count, self.swapchain.queue_depth
            )));
        }
        if self.frame.max_pressure == 0 || self.frame.latency_frames == 0 {
            return Err(ConfigError::Invalid(
                "frame.max_pressure and frame.latency_frames must be non-zero".into(),
            ));
        }
        let fov = self.tracking.half_fov_deg;
        if fov.is_nan() || fov <= 0.0 || fov >= 90.0 {
            return Err(ConfigError::Invalid(format!(
                "tracking.half_fov_deg must be in (0, 90), got {}",
                self.tracking.half_fov_deg
            )));
        }
        Ok(())
    }

    /// Nominal display period in nanoseconds.
    pub fn display_period_ns(&self) -> i64 {
        (1_000_000_000f64 / self.display.refresh_rate_hz as f64).round() as i64
    }
}

/// Returns the config file path.
/// Search order:
/// 1. `WXR_CONFIG` environment variable
/// 2. System-wide config: `%PROGRAMDATA%\WXR\wxr.toml` (Windows) or `/etc/wxr/wxr.toml`
/// 3. Local fallback: `./wxr.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("WXR_CONFIG") {
        return PathBuf::from(path);
    }
    let system_path = wxr_common::platform::system_config_dir().join("wxr.toml");
    if system_path.exists() {
        return system_path;
    }
    PathBuf::from("wxr.toml")
}

fn default_runtime_name() -> String {
    "wxr".to_string()
}

fn default_refresh_rate() -> f32 {
    90.0
}

fn default_view_width() -> u32 {
    1440
}

fn default_view_height() -> u32 {
    1600
}

fn default_max_image_size() -> u32 {
    4096
}

fn default_max_layers() -> u32 {
    16
}

fn default_max_samples() -> u32 {
    4
}

fn default_image_count() -> u32 {
    3
}

fn default_queue_depth() -> u32 {
    1
}

fn default_acquire_timeout_ms() -> u64 {
    250
}

fn default_max_pressure() -> u32 {
    4
}

fn default_latency_frames() -> u32 {
    1
}

fn default_eye_height() -> f32 {
    1.6
}

fn default_ipd() -> f32 {
    0.064
}

fn default_half_fov() -> f32 {
    45.0
}

fn default_stage_extent() -> f32 {
    3.0
}
