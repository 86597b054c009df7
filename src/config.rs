use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ErrorContext, XrayError, XrayResult};
use crate::logging::LoggingConfig;

/// Directory name under the user config dir
pub const APP_DIR_NAME: &str = "paper-xray";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct XrayConfig {
    pub analysis: AnalysisConfig,
    pub capture: CaptureConfig,
    pub viewer: ViewerConfig,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Model name used in the generateContent path
    pub model: String,

    /// API base URL, without the `models/...` suffix
    pub endpoint: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Environment variable holding the fallback API key
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Render scale for context pages, independent of the viewer zoom
    pub context_scale: f32,

    /// JPEG quality for context pages (1-100)
    pub jpeg_quality: u8,

    /// Selections must exceed this on both axes
    pub min_selection_px: f64,

    /// Text selections shorter than this are ignored
    pub min_text_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub initial_zoom: f32,
    pub zoom_step: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,

    /// Virtual pixel size of one terminal cell
    pub cell_width_px: u16,
    pub cell_height_px: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub log_dir: PathBuf,
    pub file_logging: bool,
    pub json: bool,
    pub max_log_files: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: "gemini-3-pro-preview".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 120,
            api_key_env: "API_KEY".to_string(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            context_scale: 1.0,
            jpeg_quality: 80,
            min_selection_px: 10.0,
            min_text_chars: 3,
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            initial_zoom: 1.5,
            zoom_step: 0.25,
            min_zoom: 0.5,
            max_zoom: 3.0,
            cell_width_px: 8,
            cell_height_px: 16,
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        let log_dir = dirs::data_local_dir()
            .map(|dir| dir.join(APP_DIR_NAME).join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"));
        Self {
            level: "info".to_string(),
            log_dir,
            file_logging: true,
            json: false,
            max_log_files: 10,
        }
    }
}

impl LoggingSection {
    pub fn to_logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.level.clone(),
            log_dir: self.log_dir.clone(),
            enable_file_logging: self.file_logging,
            enable_json_format: self.json,
            max_log_files: self.max_log_files,
        }
    }
}

impl XrayConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> XrayResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).with_path(path)?;

        let config: XrayConfig = toml::from_str(&content).map_err(|e| {
            XrayError::configuration(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Override individual settings from `XRAY_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var("XRAY_MODEL") {
            if !model.trim().is_empty() {
                self.analysis.model = model;
            }
        }

        if let Ok(endpoint) = std::env::var("XRAY_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.analysis.endpoint = endpoint;
            }
        }

        if let Ok(level) = std::env::var("XRAY_LOG_LEVEL") {
            if !level.trim().is_empty() {
                self.logging.level = level.to_lowercase();
            }
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> XrayResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| XrayError::configuration(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_path(parent)?;
        }
        std::fs::write(path, content).with_path(path)?;

        Ok(())
    }

    /// Default location: `<config dir>/paper-xray/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join("config.toml"))
    }

    /// Explicit file, else the default file if it exists, else defaults; env always wins.
    pub fn resolve(explicit: Option<&Path>) -> XrayResult<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn validate(&self) -> XrayResult<()> {
        if self.viewer.cell_width_px == 0 || self.viewer.cell_height_px == 0 {
            return Err(XrayError::configuration("cell size must be non-zero"));
        }
        if self.viewer.min_zoom <= 0.0 || self.viewer.min_zoom > self.viewer.max_zoom {
            return Err(XrayError::configuration(format!(
                "zoom range {}..{} is empty",
                self.viewer.min_zoom, self.viewer.max_zoom
            )));
        }
        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(XrayError::configuration(format!(
                "jpeg_quality {} is outside 1..=100",
                self.capture.jpeg_quality
            )));
        }
        if self.capture.context_scale <= 0.0 {
            return Err(XrayError::configuration("context_scale must be positive"));
        }
        Ok(())
    }
}
