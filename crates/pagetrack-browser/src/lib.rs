//! Full-page capture for the pagetrack pipeline
//!
//! This crate drives Chrome over the DevTools Protocol to turn one URL into
//! a JPEG screenshot and an HTML snapshot.
//!
//! # Features
//!
//! - **Browser Management**: One fresh Chrome session per job, always closed
//! - **Height Estimation**: Several DOM measurements combined conservatively
//! - **Screenshot Capture**: Viewport grown to the page height before capture
//! - **Normalization**: Transparency flattened onto white, re-encoded as JPEG
//!
//! # Example
//!
//! ```no_run
//! use pagetrack_browser::{CaptureEngine, CapturePaths, CaptureSettings, ChromeLauncher};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = CaptureEngine::new(Arc::new(ChromeLauncher::default()), CaptureSettings::default());
//!     let paths = CapturePaths {
//!         raw_image: PathBuf::from("raw.png"),
//!         normalized_image: PathBuf::from("shot.jpg"),
//!         html: PathBuf::from("page.html"),
//!     };
//!
//!     let result = engine.capture("https://example.com", &paths).await;
//!     println!("image: {}, html: {}", result.image_captured, result.html_captured);
//! }
//! ```
//!
//! # Requirements
//!
//! - Chrome or Chromium browser installed
//!
//! # Architecture
//!
//! - [`driver`]: Browser driver and launcher traits, plus a mock
//! - [`browser`]: Chrome implementation of the driver
//! - [`height`]: Full document height estimation
//! - [`capture`]: The capture state sequence
//! - [`normalize`]: PNG to JPEG conversion
//! - [`error`]: Error types for browser operations

pub mod browser;
pub mod capture;
pub mod driver;
pub mod error;
pub mod height;
pub mod normalize;

// Re-export commonly used types
pub use browser::{BrowserConfig, BrowserSession, ChromeLauncher};
pub use capture::{CaptureEngine, CapturePaths, CaptureSettings};
pub use driver::{BrowserDriver, BrowserLauncher, MockBrowser, MockCalls};
pub use error::{PagetrackError, Result};
pub use height::{combine_probes, estimate_full_height, HEIGHT_PROBES};
pub use normalize::{flatten_onto_white, normalize_to_jpeg};
