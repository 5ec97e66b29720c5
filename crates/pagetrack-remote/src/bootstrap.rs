//! Log destination bootstrap
//!
//! Makes sure the target sheet exists and that row 1 carries the expected
//! headers before a log row is appended. Safe to run before every append: a
//! destination that is already correct sees only reads.

use crate::store::TabularStore;
use pagetrack_core::{PagetrackError, Result};
use std::fmt;
use tracing::{debug, info, warn};

/// Whether a log row may be appended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationStatus {
    Ready,
    NotReady,
}

impl DestinationStatus {
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }
}

impl fmt::Display for DestinationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::NotReady => write!(f, "not ready"),
        }
    }
}

/// Spreadsheet column letter for a 1-based index (1 = A, 27 = AA)
pub fn column_letter(index: usize) -> String {
    let mut n = index.max(1);
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Row-1 range covering `count` header cells, e.g. `A1:C1`
pub fn header_cells(count: usize) -> String {
    format!("A1:{}1", column_letter(count))
}

/// A read error that only means the sheet has no cells yet
pub fn is_empty_range_error(err: &PagetrackError) -> bool {
    let text = err.to_string();
    err.status() == Some(400) && (text.contains("Unable to parse range") || text.contains("exceeds grid limits"))
}

/// Ensure `sheet` exists in `spreadsheet_id` with `headers` in row 1
pub async fn ensure_destination(
    store: &dyn TabularStore,
    spreadsheet_id: &str,
    sheet: &str,
    headers: &[String],
) -> DestinationStatus {
    match prepare(store, spreadsheet_id, sheet, headers).await {
        Ok(()) => {
            debug!("Log sheet '{}' is ready", sheet);
            DestinationStatus::Ready
        }
        Err(e) => {
            warn!("Log sheet '{}' in {} is not ready: {}", sheet, spreadsheet_id, e);
            DestinationStatus::NotReady
        }
    }
}

async fn prepare(store: &dyn TabularStore, spreadsheet_id: &str, sheet: &str, headers: &[String]) -> Result<()> {
    let existing = store.list_sheets(spreadsheet_id).await?;
    let created = if existing.iter().any(|title| title == sheet) {
        false
    } else {
        info!("Sheet '{}' not found, creating it", sheet);
        store.create_sheet(spreadsheet_id, sheet).await?;
        true
    };

    let cells = header_cells(headers.len());
    if !created {
        let current = match store.read_rows(spreadsheet_id, sheet, &cells).await {
            Ok(rows) => rows.into_iter().next().unwrap_or_default(),
            Err(e) if is_empty_range_error(&e) => {
                debug!("Sheet '{}' has no cells yet: {}", sheet, e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        if current.as_slice() == headers {
            return Ok(());
        }
        if current.is_empty() {
            info!("Headers missing in '{}', adding them", sheet);
        } else {
            warn!("Headers in '{}' do not match ({:?}), rewriting row 1", sheet, current);
        }
    }

    store.write_row(spreadsheet_id, sheet, &cells, headers).await?;
    info!("Headers written to '{}'", sheet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockTabularStore;

    fn headers() -> Vec<String> {
        ["Capture Date", "Image URL", "HTML Copy"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(3), "C");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(header_cells(3), "A1:C1");
    }

    #[test]
    fn test_empty_range_errors() {
        assert!(is_empty_range_error(&PagetrackError::remote_status(400, "Unable to parse range: 'Log'!A1:C1")));
        assert!(is_empty_range_error(&PagetrackError::remote_status(400, "Range ('Log'!A1:C1) exceeds grid limits")));
        assert!(!is_empty_range_error(&PagetrackError::remote_status(403, "Unable to parse range")));
        assert!(!is_empty_range_error(&PagetrackError::remote_status(400, "bad request")));
    }

    #[tokio::test]
    async fn test_creates_sheet_and_writes_headers() {
        let store = MockTabularStore::new();

        let status = ensure_destination(&store, "S", "Sheet1", &headers()).await;

        assert_eq!(status, DestinationStatus::Ready);
        assert_eq!(store.rows("Sheet1").unwrap(), vec![headers()]);
        let calls = store.calls();
        assert_eq!(calls.creates, 1);
        assert_eq!(calls.reads, 0);
        assert_eq!(calls.writes, 1);
    }

    #[tokio::test]
    async fn test_second_call_makes_no_mutation() {
        let store = MockTabularStore::new();
        ensure_destination(&store, "S", "Sheet1", &headers()).await;
        let before = store.calls().mutations();

        let status = ensure_destination(&store, "S", "Sheet1", &headers()).await;

        assert!(status.is_ready());
        assert_eq!(store.calls().mutations(), before);
        assert_eq!(store.rows("Sheet1").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_existing_empty_sheet_gets_headers() {
        let store = MockTabularStore::new().with_sheet("Log", vec![]);

        assert!(ensure_destination(&store, "S", "Log", &headers()).await.is_ready());
        assert_eq!(store.rows("Log").unwrap(), vec![headers()]);
        assert_eq!(store.calls().creates, 0);
    }

    #[tokio::test]
    async fn test_mismatched_headers_are_rewritten() {
        let store = MockTabularStore::new().with_sheet("Log", vec![vec!["Date", "Image"], vec!["old", "row"]]);

        assert!(ensure_destination(&store, "S", "Log", &headers()).await.is_ready());
        let rows = store.rows("Log").unwrap();
        assert_eq!(rows[0], headers());
        assert_eq!(rows[1], vec!["old", "row"]);
    }

    #[tokio::test]
    async fn test_list_failure_is_not_ready() {
        let store = MockTabularStore::new().failing_list();

        assert_eq!(ensure_destination(&store, "S", "Log", &headers()).await, DestinationStatus::NotReady);
        assert_eq!(store.calls().mutations(), 0);
    }

    #[tokio::test]
    async fn test_create_failure_is_not_ready() {
        let store = MockTabularStore::new().failing_create();

        assert!(!ensure_destination(&store, "S", "Log", &headers()).await.is_ready());
        assert_eq!(store.calls().writes, 0);
    }

    #[tokio::test]
    async fn test_read_failure_is_not_ready() {
        let store = MockTabularStore::new().with_sheet("Log", vec![]).failing_read();

        assert!(!ensure_destination(&store, "S", "Log", &headers()).await.is_ready());
        assert_eq!(store.calls().writes, 0);
    }

    #[tokio::test]
    async fn test_write_failure_is_not_ready() {
        let store = MockTabularStore::new().failing_write();

        assert!(!ensure_destination(&store, "S", "Log", &headers()).await.is_ready());
    }
}
