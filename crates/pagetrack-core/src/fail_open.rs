//! Fail-open utilities for stage-local failures
//!
//! A pipeline stage that may fail without aborting its job is wrapped in
//! [`fail_open`]: the error is logged with the stage name and turned into
//! `None`, which later stages consume as a plain value.
//!
//! DO NOT use fail-open for:
//! - Batch setup (scratch directory, auth, job source)
//! - Anything whose failure must stop the batch

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute a stage that should fail open
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
/// The operation is attempted exactly once.
///
/// # Usage
///
/// ```no_run
/// use pagetrack_core::fail_open::fail_open;
/// use pagetrack_core::Result;
///
/// async fn write_html() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let written = fail_open("capture::html", || write_html()).await.is_some();
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PagetrackError;

    #[tokio::test]
    async fn test_fail_open_success() {
        let result = fail_open("test_op", || async { Ok::<_, PagetrackError>(42) }).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_fail_open_failure() {
        let result = fail_open("test_op", || async {
            Err::<i32, _>(PagetrackError::Other("test error".to_string()))
        })
        .await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_fail_open_runs_once() {
        let mut attempts = 0;
        let result = fail_open("test_op", || {
            attempts += 1;
            async { Err::<i32, _>(PagetrackError::Other("persistent".to_string())) }
        })
        .await;
        assert_eq!(result, None);
        assert_eq!(attempts, 1);
    }
}
