//! Pure state machine for the per-job pipeline
//!
//! No I/O and no async: the orchestrator performs the work of each stage and
//! feeds the outcome back as an event.
//!
//! - Pure function: transition(stage, event) -> (stage, actions)
//! - Unexpected events go to Cleanup (never panic)
//! - Cleanup is reachable from every stage and always leads to Done

use std::fmt;

/// Pipeline stage of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStage {
    /// Browser capture, including image normalization
    Capture,
    PublishImage,
    PublishHtml,
    /// Prepare the log sheet
    Bootstrap,
    AppendLog,
    /// Remove local scratch files
    Cleanup,
    Done,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Capture => "capture",
            Self::PublishImage => "publish_image",
            Self::PublishHtml => "publish_html",
            Self::Bootstrap => "bootstrap",
            Self::AppendLog => "append_log",
            Self::Cleanup => "cleanup",
            Self::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    CaptureFinished { image_captured: bool, html_captured: bool },
    ImagePublished { linked: bool },
    HtmlPublished { linked: bool },
    /// No HTML was captured, so there is nothing to upload
    HtmlSkipped,
    DestinationChecked { ready: bool },
    LogAppended { appended: bool },
    ScratchRemoved { removed: usize },
    /// Give up on the rest of the job
    Abort { reason: String },
}

/// Side effects for the orchestrator to carry out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    LogActivity { message: String },
    Warn { message: String },
}

fn log(message: impl Into<String>) -> Action {
    Action::LogActivity { message: message.into() }
}

fn warn(message: impl Into<String>) -> Action {
    Action::Warn { message: message.into() }
}

/// Pure stage transition function
///
/// Image and HTML uploads are skipped when capture produced nothing. The log
/// append is skipped when the destination is not ready.
pub fn transition(stage: JobStage, event: StageEvent) -> (JobStage, Vec<Action>) {
    match (stage, event) {
        (JobStage::Capture, StageEvent::CaptureFinished { image_captured: true, html_captured }) => {
            let note = if html_captured { "image and HTML" } else { "image only" };
            (JobStage::PublishImage, vec![log(format!("Capture finished: {}", note))])
        }
        (JobStage::Capture, StageEvent::CaptureFinished { image_captured: false, .. }) => (
            JobStage::Bootstrap,
            vec![warn("Capture produced no artifacts, skipping uploads")],
        ),

        (JobStage::PublishImage, StageEvent::ImagePublished { linked }) => {
            let actions = if linked {
                vec![]
            } else {
                vec![warn("Image upload yielded no link")]
            };
            (JobStage::PublishHtml, actions)
        }

        (JobStage::PublishHtml, StageEvent::HtmlPublished { linked }) => {
            let actions = if linked {
                vec![]
            } else {
                vec![warn("HTML upload yielded no link")]
            };
            (JobStage::Bootstrap, actions)
        }
        (JobStage::PublishHtml, StageEvent::HtmlSkipped) => {
            (JobStage::Bootstrap, vec![log("No HTML snapshot to upload")])
        }

        (JobStage::Bootstrap, StageEvent::DestinationChecked { ready: true }) => (JobStage::AppendLog, vec![]),
        (JobStage::Bootstrap, StageEvent::DestinationChecked { ready: false }) => (
            JobStage::Cleanup,
            vec![warn("Skipping append operation due to sheet/header setup failure")],
        ),

        (JobStage::AppendLog, StageEvent::LogAppended { appended }) => {
            let actions = if appended {
                vec![log("Log row appended")]
            } else {
                vec![warn("Log row was not appended")]
            };
            (JobStage::Cleanup, actions)
        }

        (JobStage::Cleanup, StageEvent::ScratchRemoved { removed }) => (
            JobStage::Done,
            vec![log(format!("Cleanup removed {} local files", removed))],
        ),

        // Terminal
        (JobStage::Done, _) => (JobStage::Done, vec![]),

        (JobStage::Cleanup, event) => (
            JobStage::Done,
            vec![warn(format!("Unexpected event during cleanup: {:?}", event))],
        ),

        (stage, StageEvent::Abort { reason }) => (
            JobStage::Cleanup,
            vec![warn(format!("Job aborted during {}: {}", stage, reason))],
        ),

        // All other pairs are invalid
        (stage, event) => (
            JobStage::Cleanup,
            vec![warn(format!("Invalid stage transition: {} cannot handle {:?}", stage, event))],
        ),
    }
}
