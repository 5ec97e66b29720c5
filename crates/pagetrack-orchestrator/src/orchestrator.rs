//! Job orchestrator: runs each job through the stage machine

use crate::naming::ArtifactNames;
use crate::scratch::JobScratch;
use crate::state_machine::{transition, Action, JobStage, StageEvent};
use chrono::Local;
use pagetrack_browser::{BrowserLauncher, CaptureEngine, CaptureSettings};
use pagetrack_core::{
    CaptureResult, JobDescriptor, LinkRef, LogRow, PagetrackConfig, PublishResult, LOG_TIMESTAMP_FORMAT,
};
use pagetrack_remote::{ensure_destination, publish_artifact, DestinationStatus, RemoteContext};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Everything that happened to one job
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job: JobDescriptor,
    /// Log row timestamp, taken when the job started
    pub timestamp: String,
    pub capture: CaptureResult,
    pub image: PublishResult,
    pub html: PublishResult,
    /// `None` if bootstrap never ran
    pub destination: Option<DestinationStatus>,
    /// The row built for the log, whether or not the append succeeded
    pub row: Option<LogRow>,
    pub appended: bool,
    /// Stages in the order they ran, ending with Done
    pub stages: Vec<JobStage>,
}

impl JobReport {
    fn new(job: JobDescriptor, timestamp: String) -> Self {
        Self {
            job,
            timestamp,
            capture: CaptureResult::aborted(),
            image: PublishResult::none(),
            html: PublishResult::none(),
            destination: None,
            row: None,
            appended: false,
            stages: Vec::new(),
        }
    }
}

/// Batch totals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub appended: usize,
    pub elapsed: Duration,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} jobs processed ({} skipped, {} rows appended) in {:.2}s",
            self.processed,
            self.total,
            self.skipped,
            self.appended,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Runs capture jobs one at a time
pub struct JobOrchestrator {
    engine: CaptureEngine,
    remote: RemoteContext,
    scratch_dir: PathBuf,
    headers: Vec<String>,
}

impl JobOrchestrator {
    pub fn new(engine: CaptureEngine, remote: RemoteContext, scratch_dir: impl Into<PathBuf>, headers: Vec<String>) -> Self {
        Self {
            engine,
            remote,
            scratch_dir: scratch_dir.into(),
            headers,
        }
    }

    /// Build an orchestrator from loaded configuration
    pub fn from_config(config: &PagetrackConfig, launcher: Arc<dyn BrowserLauncher>, remote: RemoteContext) -> Self {
        let engine = CaptureEngine::new(launcher, CaptureSettings::from(&config.capture));
        Self::new(engine, remote, &config.paths.scratch_dir, config.source.headers.clone())
    }

    /// Run one job to completion; stage failures end up in the report
    pub async fn run_job(&self, job: &JobDescriptor) -> JobReport {
        let started_at = Local::now();
        let names = ArtifactNames::new(&job.target_log_name, started_at.naive_local());
        let mut scratch = JobScratch::new(names.paths_in(&self.scratch_dir));
        let mut report = JobReport::new(job.clone(), started_at.format(LOG_TIMESTAMP_FORMAT).to_string());

        let mut stage = JobStage::Capture;
        while stage != JobStage::Done {
            report.stages.push(stage);
            let event = self.run_stage(stage, &names, &mut scratch, &mut report).await;
            let (next, actions) = transition(stage, event);
            for action in actions {
                match action {
                    Action::LogActivity { message } => info!("[{}] {}", job.target_log_name, message),
                    Action::Warn { message } => warn!("[{}] {}", job.target_log_name, message),
                }
            }
            stage = next;
        }
        report.stages.push(JobStage::Done);

        report
    }

    async fn run_stage(
        &self,
        stage: JobStage,
        names: &ArtifactNames,
        scratch: &mut JobScratch,
        report: &mut JobReport,
    ) -> StageEvent {
        let job = &report.job;
        match stage {
            JobStage::Capture => {
                report.capture = self.engine.capture(&job.url, scratch.paths()).await;
                StageEvent::CaptureFinished {
                    image_captured: report.capture.image_captured,
                    html_captured: report.capture.html_captured,
                }
            }
            JobStage::PublishImage => {
                report.image = publish_artifact(
                    self.remote.objects.as_ref(),
                    report.capture.normalized_image_path.as_deref(),
                    &names.image,
                    &job.target_container_id,
                )
                .await;
                StageEvent::ImagePublished {
                    linked: report.image.shareable_link.is_some(),
                }
            }
            JobStage::PublishHtml => {
                if !report.capture.html_captured {
                    return StageEvent::HtmlSkipped;
                }
                report.html = publish_artifact(
                    self.remote.objects.as_ref(),
                    report.capture.html_path.as_deref(),
                    &names.html,
                    &job.target_container_id,
                )
                .await;
                StageEvent::HtmlPublished {
                    linked: report.html.shareable_link.is_some(),
                }
            }
            JobStage::Bootstrap => {
                let status = ensure_destination(
                    self.remote.tables.as_ref(),
                    &self.remote.spreadsheet_id,
                    &job.target_log_name,
                    &self.headers,
                )
                .await;
                report.destination = Some(status);
                StageEvent::DestinationChecked { ready: status.is_ready() }
            }
            JobStage::AppendLog => {
                let row = LogRow::new(
                    report.timestamp.clone(),
                    LinkRef::for_image(&report.capture, Some(&report.image)),
                    LinkRef::for_html(&report.capture, Some(&report.html)),
                );
                info!("Appending row to '{}': {:?}", job.target_log_name, row.to_values());
                let appended = match self
                    .remote
                    .tables
                    .append_row(&self.remote.spreadsheet_id, &job.target_log_name, &row.to_values())
                    .await
                {
                    Ok(()) => true,
                    Err(e) => {
                        error!("Error appending data to sheet '{}': {}", job.target_log_name, e);
                        false
                    }
                };
                report.row = Some(row);
                report.appended = appended;
                StageEvent::LogAppended { appended }
            }
            JobStage::Cleanup => StageEvent::ScratchRemoved {
                removed: scratch.cleanup().await,
            },
            JobStage::Done => StageEvent::Abort {
                reason: "job already finished".to_string(),
            },
        }
    }

    /// Run every job in order; invalid descriptors are skipped
    pub async fn run_batch(&self, jobs: &[JobDescriptor]) -> BatchSummary {
        let started = Instant::now();
        let mut summary = BatchSummary {
            total: jobs.len(),
            ..Default::default()
        };

        for (i, job) in jobs.iter().enumerate() {
            info!("--- Processing job {} of {}: {} ---", i + 1, jobs.len(), job.url);
            if !job.is_valid() {
                warn!("Skipping job {}: missing URL, folder id or sheet name", i + 1);
                summary.skipped += 1;
                continue;
            }

            let report = self.run_job(job).await;
            summary.processed += 1;
            if report.appended {
                summary.appended += 1;
            }
            info!("--- Finished job {} of {} ---", i + 1, jobs.len());
        }

        summary.elapsed = started.elapsed();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_summary_display() {
        let summary = BatchSummary {
            total: 3,
            processed: 2,
            skipped: 1,
            appended: 2,
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(summary.to_string(), "2 of 3 jobs processed (1 skipped, 2 rows appended) in 1.50s");
    }
}
