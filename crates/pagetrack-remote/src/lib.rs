//! Remote side of the pagetrack pipeline
//!
//! Object storage for captured artifacts (Google Drive), tabular storage for
//! the job list and the capture log (Google Sheets), and the operations the
//! pipeline runs against them.
//!
//! # Architecture
//!
//! - [`store`]: `ObjectStore` and `TabularStore` traits, plus mocks
//! - [`drive`] / [`sheets`]: Google REST implementations
//! - [`auth`]: Bearer tokens from the environment or a refreshed token file
//! - [`publish`]: Single-attempt artifact upload
//! - [`bootstrap`]: Log sheet and header preparation
//! - [`jobs`]: Job list loading
//! - [`context`]: The authenticated services shared by a batch

pub mod auth;
pub mod bootstrap;
pub mod context;
pub mod drive;
pub mod jobs;
pub mod publish;
pub mod sheets;
pub mod store;

pub use auth::{describe_expiry, AuthorizedUser, TokenSource, ACCESS_TOKEN_ENV};
pub use bootstrap::{ensure_destination, DestinationStatus};
pub use context::RemoteContext;
pub use drive::GoogleDrive;
pub use jobs::{fetch_jobs, parse_job_rows};
pub use publish::{content_type_for, publish_artifact};
pub use sheets::GoogleSheets;
pub use store::{MockObjectStore, MockTabularStore, MockUpload, ObjectStore, TableCalls, TabularStore, UploadedObject};
