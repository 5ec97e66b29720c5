//! Configuration management for pagetrack
//!
//! This module provides the configuration loaded from `pagetrack.toml`:
//! where jobs come from, capture timing, and local paths.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{PagetrackError, Result, Viewport};

/// Default config file name, resolved against the working directory
pub const DEFAULT_CONFIG_FILE: &str = "pagetrack.toml";

/// Top-level pagetrack configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PagetrackConfig {
    /// Job source and log destination
    #[serde(default)]
    pub source: SourceConfig,

    /// Browser capture parameters
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Local files
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Spreadsheet holding the job list and the log sheets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Spreadsheet ID (required)
    #[serde(default)]
    pub spreadsheet_id: String,

    /// Sheet listing jobs as `url | folder id | sheet name` rows
    #[serde(default = "default_config_sheet")]
    pub config_sheet: String,

    /// Header row every log sheet must carry
    #[serde(default = "default_headers")]
    pub headers: Vec<String>,
}

/// Capture timing and sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Hard page-load timeout
    #[serde(default = "default_page_load_timeout_secs")]
    pub page_load_timeout_secs: u64,

    /// Wait after load for async content to settle
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Wait after growing the viewport
    #[serde(default = "default_resize_delay_ms")]
    pub resize_delay_ms: u64,

    /// Wait when the viewport keeps its initial size
    #[serde(default = "default_steady_delay_ms")]
    pub steady_delay_ms: u64,

    /// Ceiling for the estimated page height
    #[serde(default = "default_max_height")]
    pub max_height: u32,

    /// JPEG quality (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Run Chrome headless
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Override Chrome's user agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Local paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Scratch directory for per-job temporary artifacts
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Authorized-user token file for Google APIs
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
}

// Default value providers
fn default_config_sheet() -> String {
    "CONFIG".to_string()
}

fn default_headers() -> Vec<String> {
    vec![
        "Capture Date".to_string(),
        "Image URL".to_string(),
        "HTML Copy".to_string(),
    ]
}

fn default_viewport_width() -> u32 {
    1366
}

fn default_viewport_height() -> u32 {
    1080
}

fn default_page_load_timeout_secs() -> u64 {
    60
}

fn default_settle_delay_ms() -> u64 {
    10_000
}

fn default_resize_delay_ms() -> u64 {
    2_000
}

fn default_steady_delay_ms() -> u64 {
    500
}

fn default_max_height() -> u32 {
    30_000
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_headless() -> bool {
    true
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("temp_web_captures")
}

fn default_token_file() -> PathBuf {
    PathBuf::from("token.json")
}

impl PagetrackConfig {
    /// Load configuration from `path`, or use defaults when the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PagetrackError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Write the default configuration to `path`
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| PagetrackError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject configurations a batch cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.source.spreadsheet_id.trim().is_empty() {
            return Err(PagetrackError::Config(
                "source.spreadsheet_id is required".to_string(),
            ));
        }
        if self.source.headers.is_empty() {
            return Err(PagetrackError::Config("source.headers must not be empty".to_string()));
        }
        if self.capture.viewport_width == 0 || self.capture.viewport_height == 0 {
            return Err(PagetrackError::Config("viewport dimensions must be positive".to_string()));
        }
        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(PagetrackError::Config(format!(
                "capture.jpeg_quality must be 1-100, got {}",
                self.capture.jpeg_quality
            )));
        }
        Ok(())
    }
}

impl CaptureConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width, self.viewport_height)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn resize_delay(&self) -> Duration {
        Duration::from_millis(self.resize_delay_ms)
    }

    pub fn steady_delay(&self) -> Duration {
        Duration::from_millis(self.steady_delay_ms)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            config_sheet: default_config_sheet(),
            headers: default_headers(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            page_load_timeout_secs: default_page_load_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            resize_delay_ms: default_resize_delay_ms(),
            steady_delay_ms: default_steady_delay_ms(),
            max_height: default_max_height(),
            jpeg_quality: default_jpeg_quality(),
            headless: default_headless(),
            user_agent: None,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            token_file: default_token_file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PagetrackConfig::default();
        assert_eq!(config.source.config_sheet, "CONFIG");
        assert_eq!(config.source.headers, vec!["Capture Date", "Image URL", "HTML Copy"]);
        assert_eq!(config.capture.viewport(), Viewport::new(1366, 1080));
        assert_eq!(config.capture.page_load_timeout(), Duration::from_secs(60));
        assert_eq!(config.capture.settle_delay(), Duration::from_secs(10));
        assert_eq!(config.capture.max_height, 30_000);
        assert_eq!(config.capture.jpeg_quality, 85);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PagetrackConfig::from_toml(
            r#"
            [source]
            spreadsheet_id = "abc123"

            [capture]
            settle_delay_ms = 0
            user_agent = "pagetrack/1.0"
            "#,
        )
        .unwrap();
        assert_eq!(config.source.spreadsheet_id, "abc123");
        assert_eq!(config.source.config_sheet, "CONFIG");
        assert_eq!(config.capture.settle_delay(), Duration::ZERO);
        assert_eq!(config.capture.resize_delay_ms, 2_000);
        assert_eq!(config.capture.user_agent.as_deref(), Some("pagetrack/1.0"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_spreadsheet_id_is_invalid() {
        let config = PagetrackConfig::default();
        assert!(matches!(config.validate(), Err(PagetrackError::Config(_))));
    }

    #[test]
    fn test_bad_quality_is_invalid() {
        let mut config = PagetrackConfig::default();
        config.source.spreadsheet_id = "abc".to_string();
        config.capture.jpeg_quality = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_and_write_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagetrack.toml");

        let config = PagetrackConfig::load_or_default(&path).unwrap();
        assert!(config.source.spreadsheet_id.is_empty());

        PagetrackConfig::write_default(&path).unwrap();
        let reloaded = PagetrackConfig::load_or_default(&path).unwrap();
        assert_eq!(reloaded.capture.viewport_width, 1366);
        assert_eq!(reloaded.paths.scratch_dir, PathBuf::from("temp_web_captures"));
        assert!(reloaded.capture.user_agent.is_none());
    }

    #[test]
    fn test_invalid_toml() {
        let err = PagetrackConfig::from_toml("[capture\nbroken").unwrap_err();
        assert!(matches!(err, PagetrackError::Config(_)));
    }
}
