//! Browser driver abstraction (allows mocking in tests)

use crate::error::{PagetrackError, Result};
use crate::height::HEIGHT_PROBES;
use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use pagetrack_core::Viewport;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One live browser session driving a single page
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Load `url`, failing if the page does not finish loading within `timeout`
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Evaluate a JavaScript expression and return its JSON value
    async fn execute_script(&self, expression: &str) -> Result<Value>;

    /// Resize the viewport
    async fn resize_viewport(&self, width: u32, height: u32) -> Result<()>;

    /// Write a PNG raster of the current viewport to `path`
    async fn capture_raster(&self, path: &Path) -> Result<()>;

    /// Serialized DOM of the rendered page
    async fn serialized_document(&self) -> Result<String>;

    /// Tear the session down
    async fn close(&self) -> Result<()>;
}

/// Creates one browser session per job
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, viewport: Viewport) -> Result<Box<dyn BrowserDriver>>;
}

/// Calls observed by a [`MockBrowser`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub launches: usize,
    pub navigations: Vec<String>,
    pub scripts: Vec<String>,
    pub resizes: Vec<(u32, u32)>,
    pub rasters: usize,
    pub documents: usize,
    pub closes: usize,
}

/// Mock browser for testing
///
/// Acts as its own launcher; every launched session shares the call log.
/// Scripts without a configured response fail.
#[derive(Clone)]
pub struct MockBrowser {
    scripts: HashMap<String, Value>,
    document: String,
    raster_size: (u32, u32),
    fail_launch: bool,
    fail_navigation: bool,
    fail_raster: bool,
    corrupt_raster: bool,
    fail_document: bool,
    fail_close: bool,
    calls: Arc<Mutex<MockCalls>>,
}

impl Default for MockBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBrowser {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            document: "<html><head></head><body>mock</body></html>".to_string(),
            raster_size: (8, 6),
            fail_launch: false,
            fail_navigation: false,
            fail_raster: false,
            corrupt_raster: false,
            fail_document: false,
            fail_close: false,
            calls: Arc::new(Mutex::new(MockCalls::default())),
        }
    }

    pub fn with_script(mut self, expression: &str, value: Value) -> Self {
        self.scripts.insert(expression.to_string(), value);
        self
    }

    /// Answer every height probe with `height`
    pub fn with_page_height(mut self, height: u32) -> Self {
        for probe in HEIGHT_PROBES {
            self.scripts.insert(probe.to_string(), Value::from(height));
        }
        self
    }

    pub fn with_document(mut self, html: &str) -> Self {
        self.document = html.to_string();
        self
    }

    pub fn failing_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    pub fn failing_raster(mut self) -> Self {
        self.fail_raster = true;
        self
    }

    /// Write bytes that are not an image, so conversion fails
    pub fn corrupt_raster(mut self) -> Self {
        self.corrupt_raster = true;
        self
    }

    pub fn failing_document(mut self) -> Self {
        self.fail_document = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Snapshot of the calls made so far
    pub fn calls(&self) -> MockCalls {
        self.record(|calls| calls.clone())
    }

    fn record<R>(&self, f: impl FnOnce(&mut MockCalls) -> R) -> R {
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut calls)
    }
}

#[async_trait]
impl BrowserLauncher for MockBrowser {
    async fn launch(&self, _viewport: Viewport) -> Result<Box<dyn BrowserDriver>> {
        self.record(|calls| calls.launches += 1);
        if self.fail_launch {
            return Err(PagetrackError::Browser("mock launch failure".to_string()));
        }
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl BrowserDriver for MockBrowser {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        self.record(|calls| calls.navigations.push(url.to_string()));
        if self.fail_navigation {
            return Err(PagetrackError::Navigation {
                url: url.to_string(),
                reason: format!("timed out after {:?}", timeout),
            });
        }
        Ok(())
    }

    async fn execute_script(&self, expression: &str) -> Result<Value> {
        self.record(|calls| calls.scripts.push(expression.to_string()));
        self.scripts
            .get(expression)
            .cloned()
            .ok_or_else(|| PagetrackError::Browser(format!("No mock response for: {}", expression)))
    }

    async fn resize_viewport(&self, width: u32, height: u32) -> Result<()> {
        self.record(|calls| calls.resizes.push((width, height)));
        Ok(())
    }

    async fn capture_raster(&self, path: &Path) -> Result<()> {
        self.record(|calls| calls.rasters += 1);
        if self.fail_raster {
            return Err(PagetrackError::Capture("mock raster failure".to_string()));
        }
        if self.corrupt_raster {
            tokio::fs::write(path, b"not a png").await?;
            return Ok(());
        }
        let (width, height) = self.raster_size;
        RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 128]))
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| PagetrackError::Capture(format!("mock raster write failed: {}", e)))
    }

    async fn serialized_document(&self) -> Result<String> {
        self.record(|calls| calls.documents += 1);
        if self.fail_document {
            return Err(PagetrackError::Capture("mock document failure".to_string()));
        }
        Ok(self.document.clone())
    }

    async fn close(&self) -> Result<()> {
        self.record(|calls| calls.closes += 1);
        if self.fail_close {
            return Err(PagetrackError::Browser("mock close failure".to_string()));
        }
        Ok(())
    }
}
