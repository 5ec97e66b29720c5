//! # pagetrack-orchestrator
//!
//! Runs capture jobs end to end.
//!
//! This crate provides:
//! - A pure stage machine for the per-job control flow
//! - Artifact naming and per-job scratch file lifetime
//! - The job orchestrator and the sequential batch runner

mod naming;
mod orchestrator;
mod scratch;
mod state_machine;

pub use naming::{sanitize_log_name, ArtifactNames, FALLBACK_LOG_NAME, MAX_NAME_LEN};
pub use orchestrator::{BatchSummary, JobOrchestrator, JobReport};
pub use scratch::JobScratch;
pub use state_machine::{transition, Action, JobStage, StageEvent};
