//! Core type definitions for the capture pipeline

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Timestamp format used in log rows
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp format used in artifact file names
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One unit of work: a URL, where its artifacts go, and which sheet logs it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Page to capture
    pub url: String,
    /// Drive folder receiving the screenshot and HTML
    pub target_container_id: String,
    /// Sheet (tab) receiving the log row
    pub target_log_name: String,
}

impl JobDescriptor {
    /// Build a descriptor, trimming surrounding whitespace from every field
    pub fn new(
        url: impl AsRef<str>,
        target_container_id: impl AsRef<str>,
        target_log_name: impl AsRef<str>,
    ) -> Self {
        Self {
            url: url.as_ref().trim().to_string(),
            target_container_id: target_container_id.as_ref().trim().to_string(),
            target_log_name: target_log_name.as_ref().trim().to_string(),
        }
    }

    /// A descriptor is usable only when no field is empty
    pub fn is_valid(&self) -> bool {
        !self.url.is_empty() && !self.target_container_id.is_empty() && !self.target_log_name.is_empty()
    }
}

/// Browser viewport size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1366, 1080)
    }
}

/// Capture engine progress for one page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    #[default]
    Idle,
    Loaded,
    Settled,
    Sized,
    ImageCaptured,
    HtmlCaptured,
    Done,
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loaded => write!(f, "loaded"),
            Self::Settled => write!(f, "settled"),
            Self::Sized => write!(f, "sized"),
            Self::ImageCaptured => write!(f, "image_captured"),
            Self::HtmlCaptured => write!(f, "html_captured"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Outcome of capturing one page
///
/// Paths are set for every file the engine may have written; the
/// orchestrator removes all of them at cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureResult {
    pub raw_image_path: Option<PathBuf>,
    pub normalized_image_path: Option<PathBuf>,
    pub html_path: Option<PathBuf>,
    pub image_captured: bool,
    pub html_captured: bool,
    /// Furthest state reached before the engine finished
    pub reached: CaptureState,
}

impl CaptureResult {
    /// Result for a capture that stopped before the page finished loading
    pub fn aborted() -> Self {
        Self::default()
    }

    /// Whether the page loaded at all
    pub fn page_loaded(&self) -> bool {
        self.reached >= CaptureState::Loaded
    }
}

/// The two artifacts produced per job, one log cell each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Image,
    Html,
}

impl ArtifactKind {
    /// Name used in the upload placeholder of this artifact's cell
    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "JPG",
            Self::Html => "HTML",
        }
    }
}

/// Result of uploading one artifact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub object_id: Option<String>,
    pub shareable_link: Option<String>,
}

impl PublishResult {
    /// No upload happened, or it failed
    pub fn none() -> Self {
        Self::default()
    }

    pub fn linked(object_id: impl Into<String>, shareable_link: impl Into<String>) -> Self {
        Self {
            object_id: Some(object_id.into()),
            shareable_link: Some(shareable_link.into()),
        }
    }
}

/// What a log row cell says about one artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkRef {
    /// Upload succeeded
    Linked(String),
    /// The artifact was never produced
    CaptureFailed,
    /// The artifact was produced but the upload yielded no link
    UploadFailed,
    /// The artifact was not attempted because an earlier capture step failed
    Skipped,
}

impl LinkRef {
    /// Derive the reference from whether the artifact exists and what its upload returned
    fn from_outcome(captured: bool, publish: Option<&PublishResult>, not_captured: LinkRef) -> Self {
        if !captured {
            return not_captured;
        }
        match publish.and_then(|p| p.shareable_link.clone()) {
            Some(link) => Self::Linked(link),
            None => Self::UploadFailed,
        }
    }

    /// Reference for the screenshot cell
    pub fn for_image(capture: &CaptureResult, publish: Option<&PublishResult>) -> Self {
        Self::from_outcome(capture.image_captured, publish, Self::CaptureFailed)
    }

    /// Reference for the HTML cell
    ///
    /// HTML is only attempted after a successful image capture, so a loaded
    /// page without an image means the HTML step was skipped.
    pub fn for_html(capture: &CaptureResult, publish: Option<&PublishResult>) -> Self {
        let not_captured = if capture.page_loaded() && !capture.image_captured {
            Self::Skipped
        } else {
            Self::CaptureFailed
        };
        Self::from_outcome(capture.html_captured, publish, not_captured)
    }

    pub fn is_linked(&self) -> bool {
        matches!(self, Self::Linked(_))
    }

    /// Text written to the log cell of `kind`
    pub fn cell_text(&self, kind: ArtifactKind) -> String {
        match self {
            Self::Linked(link) => link.clone(),
            Self::CaptureFailed => "Capture Failed".to_string(),
            Self::UploadFailed => format!("{} Upload Failed", kind.label()),
            Self::Skipped => "Capture Skipped/Failed".to_string(),
        }
    }
}

/// One appended log row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRow {
    pub timestamp: String,
    pub image_reference: LinkRef,
    pub html_reference: LinkRef,
}

impl LogRow {
    pub fn new(timestamp: impl Into<String>, image_reference: LinkRef, html_reference: LinkRef) -> Self {
        Self {
            timestamp: timestamp.into(),
            image_reference,
            html_reference,
        }
    }

    /// Cell values in header order
    pub fn to_values(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.image_reference.cell_text(ArtifactKind::Image),
            self.html_reference.cell_text(ArtifactKind::Html),
        ]
    }
}
