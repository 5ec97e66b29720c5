//! Artifact file names

use chrono::NaiveDateTime;
use pagetrack_browser::CapturePaths;
use pagetrack_core::FILE_TIMESTAMP_FORMAT;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Used when a log name sanitizes to nothing
pub const FALLBACK_LOG_NAME: &str = "capture";

/// Longest sanitized log name, in characters
pub const MAX_NAME_LEN: usize = 100;

fn forbidden_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[<>:"/\\|?*]+"#).expect("valid regex"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Make a log name safe to embed in a file name
pub fn sanitize_log_name(name: &str) -> String {
    let stripped = forbidden_chars().replace_all(name, "");
    let joined = whitespace_runs().replace_all(&stripped, "_");
    let trimmed = joined.trim_matches('_');
    let base = if trimmed.is_empty() { FALLBACK_LOG_NAME } else { trimmed };
    base.chars().take(MAX_NAME_LEN).collect()
}

/// File names for one job's artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    /// Published screenshot
    pub image: String,
    /// Published page source
    pub html: String,
    /// Browser raster, never published
    pub raw_image: String,
}

impl ArtifactNames {
    pub fn new(log_name: &str, captured_at: NaiveDateTime) -> Self {
        let stamp = captured_at.format(FILE_TIMESTAMP_FORMAT);
        let name = sanitize_log_name(log_name);
        Self {
            image: format!("{}_{}_screenshot.jpg", stamp, name),
            html: format!("{}_{}_pagesource.html", stamp, name),
            raw_image: format!("temp_{}_{}.png", stamp, name),
        }
    }

    /// Local paths for these names under `dir`
    pub fn paths_in(&self, dir: &Path) -> CapturePaths {
        CapturePaths {
            raw_image: dir.join(&self.raw_image),
            normalized_image: dir.join(&self.image),
            html: dir.join(&self.html),
        }
    }
}
