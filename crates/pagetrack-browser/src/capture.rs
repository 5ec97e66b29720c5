//! Full-page capture of one URL
//!
//! The engine walks `Idle → Loaded → Settled → Sized → ImageCaptured →
//! HtmlCaptured → Done`. A launch or navigation failure ends the walk early;
//! image and HTML failures are recorded in the [`CaptureResult`] and never
//! returned as errors. The browser session is closed on every path.

use crate::driver::{BrowserDriver, BrowserLauncher};
use crate::error::{PagetrackError, Result};
use crate::height::{estimate_full_height, DEFAULT_MAX_HEIGHT};
use crate::normalize::{normalize_to_jpeg, DEFAULT_JPEG_QUALITY};
use pagetrack_core::config::CaptureConfig;
use pagetrack_core::fail_open::fail_open;
use pagetrack_core::{CaptureResult, CaptureState, Viewport};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Timing and sizing for a capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    pub viewport: Viewport,
    pub page_load_timeout: Duration,
    pub settle_delay: Duration,
    pub resize_delay: Duration,
    pub steady_delay: Duration,
    pub max_height: u32,
    pub jpeg_quality: u8,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            page_load_timeout: Duration::from_secs(60),
            settle_delay: Duration::from_secs(10),
            resize_delay: Duration::from_secs(2),
            steady_delay: Duration::from_millis(500),
            max_height: DEFAULT_MAX_HEIGHT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl From<&CaptureConfig> for CaptureSettings {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            viewport: config.viewport(),
            page_load_timeout: config.page_load_timeout(),
            settle_delay: config.settle_delay(),
            resize_delay: config.resize_delay(),
            steady_delay: config.steady_delay(),
            max_height: config.max_height,
            jpeg_quality: config.jpeg_quality,
        }
    }
}

impl CaptureSettings {
    /// Same settings with every pause removed
    pub fn without_delays(self) -> Self {
        Self {
            settle_delay: Duration::ZERO,
            resize_delay: Duration::ZERO,
            steady_delay: Duration::ZERO,
            ..self
        }
    }
}

/// Local files a capture may write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturePaths {
    /// PNG straight from the browser
    pub raw_image: PathBuf,
    /// Published JPEG
    pub normalized_image: PathBuf,
    /// Serialized DOM
    pub html: PathBuf,
}

impl CapturePaths {
    pub fn all(&self) -> [&Path; 3] {
        [&self.raw_image, &self.normalized_image, &self.html]
    }
}

/// Drives one browser session per URL and produces its artifacts
pub struct CaptureEngine {
    launcher: Arc<dyn BrowserLauncher>,
    settings: CaptureSettings,
}

impl CaptureEngine {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, settings: CaptureSettings) -> Self {
        Self { launcher, settings }
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Capture `url` into `paths`
    pub async fn capture(&self, url: &str, paths: &CapturePaths) -> CaptureResult {
        let mut result = CaptureResult::aborted();

        info!("Setting up browser for {}", url);
        let driver = match self.launcher.launch(self.settings.viewport).await {
            Ok(driver) => driver,
            Err(e) => {
                error!("Could not start browser for {}: {}", url, e);
                return result;
            }
        };

        self.drive(driver.as_ref(), url, paths, &mut result).await;

        if let Err(e) = driver.close().await {
            warn!("Error while closing browser for {}: {}", url, e);
        }
        advance(&mut result, url, CaptureState::Done);

        result
    }

    async fn drive(&self, driver: &dyn BrowserDriver, url: &str, paths: &CapturePaths, result: &mut CaptureResult) {
        info!("Accessing URL: {}", url);
        if let Err(e) = driver.navigate(url, self.settings.page_load_timeout).await {
            error!("Page load failed, no artifacts for {}: {}", url, e);
            return;
        }
        advance(result, url, CaptureState::Loaded);

        info!("Waiting {:?} for page to settle", self.settings.settle_delay);
        tokio::time::sleep(self.settings.settle_delay).await;
        advance(result, url, CaptureState::Settled);

        result.raw_image_path = Some(paths.raw_image.clone());
        let image_captured = fail_open("capture::screenshot", || self.capture_image(driver, paths))
            .await
            .is_some();
        if !image_captured {
            remove_partial(&paths.raw_image).await;
            remove_partial(&paths.normalized_image).await;
            result.raw_image_path = None;
            info!("Skipping HTML capture due to earlier screenshot failure");
            return;
        }
        result.normalized_image_path = Some(paths.normalized_image.clone());
        result.image_captured = true;
        advance(result, url, CaptureState::Sized);
        advance(result, url, CaptureState::ImageCaptured);

        info!("Capturing HTML source");
        result.html_path = Some(paths.html.clone());
        if fail_open("capture::html", || capture_html(driver, &paths.html))
            .await
            .is_some()
        {
            result.html_captured = true;
            advance(result, url, CaptureState::HtmlCaptured);
        } else {
            remove_partial(&paths.html).await;
            result.html_path = None;
        }
    }

    /// Size the viewport to the page, take the raster, convert it
    async fn capture_image(&self, driver: &dyn BrowserDriver, paths: &CapturePaths) -> Result<()> {
        let Viewport { width, height } = self.settings.viewport;
        let full_height = estimate_full_height(driver, height, self.settings.max_height).await;

        if full_height > height {
            info!("Resizing viewport height to {}px", full_height);
            driver.resize_viewport(width, full_height).await?;
            tokio::time::sleep(self.settings.resize_delay).await;
        } else {
            info!("Using initial viewport height ({}px)", height);
            driver.resize_viewport(width, height).await?;
            tokio::time::sleep(self.settings.steady_delay).await;
        }

        driver.capture_raster(&paths.raw_image).await?;
        debug!("Temporary PNG saved: {}", paths.raw_image.display());

        let (raw, normalized) = (paths.raw_image.clone(), paths.normalized_image.clone());
        let quality = self.settings.jpeg_quality;
        tokio::task::spawn_blocking(move || normalize_to_jpeg(&raw, &normalized, quality))
            .await
            .map_err(|e| PagetrackError::Image(format!("Conversion task failed: {}", e)))??;
        info!("Screenshot saved: {}", paths.normalized_image.display());
        Ok(())
    }
}

async fn capture_html(driver: &dyn BrowserDriver, path: &Path) -> Result<()> {
    let html = driver.serialized_document().await?;
    tokio::fs::write(path, html).await?;
    info!("HTML source saved: {}", path.display());
    Ok(())
}

fn advance(result: &mut CaptureResult, url: &str, state: CaptureState) {
    debug!("Capture of {}: {} -> {}", url, result.reached, state);
    // Done is terminal only; `reached` keeps the last productive state
    if state != CaptureState::Done {
        result.reached = state;
    }
}

/// Remove a file a failed step may have left behind
pub async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove temp file {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MockBrowser;

    fn paths_in(dir: &Path) -> CapturePaths {
        CapturePaths {
            raw_image: dir.join("temp_raw.png"),
            normalized_image: dir.join("shot.jpg"),
            html: dir.join("page.html"),
        }
    }

    fn engine(browser: &MockBrowser) -> CaptureEngine {
        CaptureEngine::new(Arc::new(browser.clone()), CaptureSettings::default().without_delays())
    }

    #[tokio::test]
    async fn test_full_capture() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        let browser = MockBrowser::new().with_page_height(4000).with_document("<html>ok</html>");

        let result = engine(&browser).capture("https://example.com", &paths).await;

        assert!(result.image_captured);
        assert!(result.html_captured);
        assert_eq!(result.reached, CaptureState::HtmlCaptured);
        assert!(paths.normalized_image.exists());
        assert_eq!(std::fs::read_to_string(&paths.html).unwrap(), "<html>ok</html>");

        let calls = browser.calls();
        assert_eq!(calls.resizes, vec![(1366, 4000)]);
        assert_eq!(calls.closes, 1);
    }

    #[tokio::test]
    async fn test_short_page_keeps_initial_viewport() {
        let dir = tempfile::tempdir().unwrap();
        let browser = MockBrowser::new().with_page_height(600);

        let result = engine(&browser).capture("https://example.com", &paths_in(dir.path())).await;

        assert!(result.image_captured);
        assert_eq!(browser.calls().resizes, vec![(1366, 1080)]);
    }

    #[tokio::test]
    async fn test_navigation_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let browser = MockBrowser::new().failing_navigation();

        let result = engine(&browser).capture("https://example.com", &paths_in(dir.path())).await;

        assert_eq!(result, CaptureResult::aborted());
        let calls = browser.calls();
        assert_eq!(calls.rasters, 0);
        assert_eq!(calls.documents, 0);
        assert_eq!(calls.closes, 1);
    }

    #[tokio::test]
    async fn test_launch_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let browser = MockBrowser::new().failing_launch();

        let result = engine(&browser).capture("https://example.com", &paths_in(dir.path())).await;

        assert!(!result.page_loaded());
        assert!(browser.calls().navigations.is_empty());
    }

    #[tokio::test]
    async fn test_raster_failure_skips_html() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        let browser = MockBrowser::new().failing_raster();

        let result = engine(&browser).capture("https://example.com", &paths).await;

        assert!(!result.image_captured);
        assert!(!result.html_captured);
        assert_eq!(result.reached, CaptureState::Settled);
        assert_eq!(browser.calls().documents, 0);
        assert!(!paths.raw_image.exists());
    }

    #[tokio::test]
    async fn test_conversion_failure_counts_as_image_failure() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        let browser = MockBrowser::new().corrupt_raster();

        let result = engine(&browser).capture("https://example.com", &paths).await;

        assert!(!result.image_captured);
        assert!(result.raw_image_path.is_none());
        assert!(!paths.raw_image.exists());
        assert_eq!(browser.calls().documents, 0);
    }

    #[tokio::test]
    async fn test_html_failure_keeps_image() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        let browser = MockBrowser::new().failing_document();

        let result = engine(&browser).capture("https://example.com", &paths).await;

        assert!(result.image_captured);
        assert!(!result.html_captured);
        assert!(result.html_path.is_none());
        assert!(!paths.html.exists());
    }

    #[tokio::test]
    async fn test_close_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let browser = MockBrowser::new().failing_close();

        let result = engine(&browser).capture("https://example.com", &paths_in(dir.path())).await;

        assert!(result.image_captured);
        assert_eq!(browser.calls().closes, 1);
    }

    #[test]
    fn test_settings_from_config() {
        let settings = CaptureSettings::from(&CaptureConfig::default());
        assert_eq!(settings, CaptureSettings::default());
        assert_eq!(settings.without_delays().settle_delay, Duration::ZERO);
    }
}
