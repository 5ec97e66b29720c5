//! Browser error types - re-exports unified PagetrackError from pagetrack-core
//!
//! Browser failures use these variants of the unified error:
//! - Browser(String) - launch, CDP and teardown failures
//! - Navigation { url, reason } - page load failures and timeouts
//! - Capture(String) - raster and DOM extraction failures
//! - Image(String) - decode/encode failures during normalization
//!
//! Error messages should name the URL or file involved.

pub use pagetrack_core::{PagetrackError, Result};
