//! Browser lifecycle management using Chrome DevTools Protocol

use crate::driver::{BrowserDriver, BrowserLauncher};
use crate::error::{PagetrackError, Result};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::types::Bounds;
use headless_chrome::{Browser, LaunchOptions, Tab};
use pagetrack_core::config::CaptureConfig;
use pagetrack_core::Viewport;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Chrome flags applied to every session
const CHROME_ARGS: [&str; 4] = [
    "--hide-scrollbars",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--log-level=3",
];

/// Configuration for browser launch
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true)
    pub headless: bool,
    /// User agent override
    pub user_agent: Option<String>,
    /// How long Chrome may stay silent before the session is dropped
    pub idle_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: None,
            idle_timeout: Duration::from_secs(300),
        }
    }
}

impl From<&CaptureConfig> for BrowserConfig {
    fn from(capture: &CaptureConfig) -> Self {
        // Loading plus settling must fit inside the idle window
        let busy = capture.page_load_timeout() + capture.settle_delay() + capture.resize_delay();
        Self {
            headless: capture.headless,
            user_agent: capture.user_agent.clone(),
            idle_timeout: busy.max(Duration::from_secs(60)) * 2,
        }
    }
}

/// Launches a fresh local Chrome per job
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    config: BrowserConfig,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self, viewport: Viewport) -> Result<Box<dyn BrowserDriver>> {
        let session = BrowserSession::launch_with_config(&self.config, viewport).await?;
        Ok(Box::new(session))
    }
}

/// Active browser session with Chrome DevTools Protocol
pub struct BrowserSession {
    /// Underlying browser instance (kept alive for tab lifetime)
    #[allow(dead_code)]
    browser: Browser,
    /// Current active tab
    tab: Arc<Tab>,
}

impl BrowserSession {
    /// Launch browser with custom configuration
    pub async fn launch_with_config(config: &BrowserConfig, viewport: Viewport) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{})",
            config.headless, viewport.width, viewport.height
        );

        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false)
            .window_size(Some((viewport.width, viewport.height)))
            .idle_browser_timeout(config.idle_timeout)
            .args(CHROME_ARGS.iter().map(|arg| OsStr::new(*arg)).collect())
            .build()
            .map_err(|e| PagetrackError::Browser(format!("Failed to launch browser: {}", e)))?;

        // Add user agent if specified
        let user_agent_arg: Option<String> = config.user_agent.as_ref().map(|ua| format!("--user-agent={}", ua));
        if let Some(ref ua_arg) = user_agent_arg {
            launch_options.args.push(OsStr::new(ua_arg));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| PagetrackError::Browser(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| PagetrackError::Browser(format!("Failed to create tab: {}", e)))?;

        info!("Browser launched successfully");

        Ok(Self { browser, tab })
    }
}

#[async_trait]
impl BrowserDriver for BrowserSession {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        debug!("Navigating to {} (timeout: {:?})", url, timeout);

        self.tab.set_default_timeout(timeout);

        self.tab.navigate_to(url).map_err(|e| PagetrackError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| PagetrackError::Navigation {
                url: url.to_string(),
                reason: format!("page did not finish loading: {}", e),
            })?;

        info!("Successfully navigated to {}", url);
        Ok(())
    }

    async fn execute_script(&self, expression: &str) -> Result<serde_json::Value> {
        debug!("Evaluating JavaScript: {}", expression);

        let result = self
            .tab
            .evaluate(expression, false)
            .map_err(|e| PagetrackError::Browser(format!("JavaScript evaluation failed: {}", e)))?;

        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    async fn resize_viewport(&self, width: u32, height: u32) -> Result<()> {
        debug!("Resizing window to {}x{}", width, height);

        self.tab
            .set_bounds(Bounds::Normal {
                left: Some(0),
                top: Some(0),
                width: Some(f64::from(width)),
                height: Some(f64::from(height)),
            })
            .map_err(|e| PagetrackError::Browser(format!("Failed to resize window: {}", e)))?;

        Ok(())
    }

    async fn capture_raster(&self, path: &Path) -> Result<()> {
        let png = self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| PagetrackError::Capture(format!("CDP capture failed: {}", e)))?;

        tokio::fs::write(path, &png).await?;
        debug!("Raster written: {} ({} bytes)", path.display(), png.len());
        Ok(())
    }

    async fn serialized_document(&self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| PagetrackError::Capture(format!("Failed to read page source: {}", e)))
    }

    async fn close(&self) -> Result<()> {
        info!("Closing browser session");
        self.tab
            .close(true)
            .map_err(|e| PagetrackError::Browser(format!("Failed to close tab: {}", e)))?;
        // Chrome exits when the Browser handle is dropped
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert!(config.user_agent.is_none());
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_config_from_capture_settings() {
        let capture = CaptureConfig {
            headless: false,
            ..Default::default()
        };
        let config = BrowserConfig::from(&capture);
        assert!(!config.headless);
        assert!(config.user_agent.is_none());
        // 60s load + 10s settle + 2s resize, doubled
        assert_eq!(config.idle_timeout, Duration::from_secs(144));
    }

    #[test]
    fn test_config_carries_user_agent() {
        let capture = CaptureConfig {
            user_agent: Some("pagetrack/1.0".to_string()),
            ..Default::default()
        };
        assert_eq!(BrowserConfig::from(&capture).user_agent.as_deref(), Some("pagetrack/1.0"));
    }
}
