//! # pagetrack-core
//!
//! Core types for the pagetrack capture-and-publish pipeline.
//!
//! A batch reads a list of jobs from a spreadsheet, and every job captures a
//! full-page screenshot plus an HTML snapshot of one URL, uploads both to
//! Drive and appends one log row to a sheet.
//!
//! ## Core Paradigm
//!
//! - Jobs are independent and processed one at a time
//! - Stage failures become values (`bool`/`Option`), never early returns
//! - Missing links are a closed set of placeholders ([`LinkRef`])
//! - Remote state preparation is idempotent

pub mod config;
mod error;
pub mod fail_open;
mod types;

pub use config::PagetrackConfig;
pub use error::{PagetrackError, Result};
pub use types::*;
