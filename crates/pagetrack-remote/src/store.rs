//! Remote store abstractions (allows mocking in tests)

use async_trait::async_trait;
use pagetrack_core::{PagetrackError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// An object created by an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedObject {
    pub id: String,
    /// Browser link; the store may omit it
    #[serde(default, rename = "webViewLink")]
    pub link: Option<String>,
}

/// Object store receiving captured artifacts (Drive)
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `path` as `name` into `container_id`
    async fn upload(&self, path: &Path, name: &str, container_id: &str, content_type: &str) -> Result<UploadedObject>;
}

/// Tabular store holding the job list and log sheets (Sheets)
///
/// `cells` ranges use A1 notation without the sheet prefix, e.g. `A1:C1`.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Titles of every sheet in the spreadsheet
    async fn list_sheets(&self, spreadsheet_id: &str) -> Result<Vec<String>>;

    async fn create_sheet(&self, spreadsheet_id: &str, sheet: &str) -> Result<()>;

    /// Rows in `cells`; trailing empty rows and cells may be omitted
    async fn read_rows(&self, spreadsheet_id: &str, sheet: &str, cells: &str) -> Result<Vec<Vec<String>>>;

    /// Overwrite one row starting at `cells`
    async fn write_row(&self, spreadsheet_id: &str, sheet: &str, cells: &str, values: &[String]) -> Result<()>;

    /// Append one row after the last row with data
    async fn append_row(&self, spreadsheet_id: &str, sheet: &str, values: &[String]) -> Result<()>;
}

/// An upload seen by [`MockObjectStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockUpload {
    pub name: String,
    pub container_id: String,
    pub content_type: String,
    pub size_bytes: usize,
}

/// Mock object store for testing
///
/// Uploads succeed with a deterministic link unless their content type was
/// marked as failing.
#[derive(Clone, Default)]
pub struct MockObjectStore {
    failing_types: HashSet<String>,
    fail_all: bool,
    uploads: Arc<Mutex<Vec<MockUpload>>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_content_type(mut self, content_type: &str) -> Self {
        self.failing_types.insert(content_type.to_string());
        self
    }

    pub fn failing_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Attempted uploads, successful or not
    pub fn uploads(&self) -> Vec<MockUpload> {
        self.uploads.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn upload(&self, path: &Path, name: &str, container_id: &str, content_type: &str) -> Result<UploadedObject> {
        let bytes = tokio::fs::read(path).await?;
        self.uploads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(MockUpload {
                name: name.to_string(),
                container_id: container_id.to_string(),
                content_type: content_type.to_string(),
                size_bytes: bytes.len(),
            });

        if self.fail_all || self.failing_types.contains(content_type) {
            return Err(PagetrackError::remote_status(500, format!("mock upload failure for {}", name)));
        }

        Ok(UploadedObject {
            id: format!("obj-{}", name),
            link: Some(format!("https://drive.mock/{}/{}", container_id, name)),
        })
    }
}

/// Calls seen by [`MockTabularStore`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCalls {
    pub lists: usize,
    pub creates: usize,
    pub reads: usize,
    pub writes: usize,
    pub appends: usize,
}

impl TableCalls {
    /// Creations, header writes and appends
    pub fn mutations(&self) -> usize {
        self.creates + self.writes + self.appends
    }
}

#[derive(Default)]
struct MockTables {
    sheets: BTreeMap<String, Vec<Vec<String>>>,
    calls: TableCalls,
}

/// In-memory tabular store for testing
///
/// Holds a single spreadsheet; the spreadsheet id is ignored.
#[derive(Clone, Default)]
pub struct MockTabularStore {
    fail_list: bool,
    fail_create: bool,
    fail_read: bool,
    fail_write: bool,
    fail_append: bool,
    state: Arc<Mutex<MockTables>>,
}

impl MockTabularStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(self, sheet: &str, rows: Vec<Vec<&str>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(str::to_string).collect())
            .collect();
        self.lock().sheets.insert(sheet.to_string(), rows);
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_read(mut self) -> Self {
        self.fail_read = true;
        self
    }

    pub fn failing_write(mut self) -> Self {
        self.fail_write = true;
        self
    }

    pub fn failing_append(mut self) -> Self {
        self.fail_append = true;
        self
    }

    /// Current contents of a sheet
    pub fn rows(&self, sheet: &str) -> Option<Vec<Vec<String>>> {
        self.lock().sheets.get(sheet).cloned()
    }

    pub fn calls(&self) -> TableCalls {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockTables> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn mock_failure(operation: &str, sheet: &str) -> PagetrackError {
    PagetrackError::remote_status(500, format!("mock {} failure for '{}'", operation, sheet))
}

/// Row bounds of an A1 range such as `A2:C` or `A1:C1` (1-based, inclusive)
fn row_bounds(cells: &str) -> (usize, Option<usize>) {
    fn row_of(cell: &str) -> Option<usize> {
        cell.trim_start_matches(|c: char| c.is_ascii_alphabetic()).parse().ok()
    }
    let mut parts = cells.splitn(2, ':');
    let start = parts.next().and_then(row_of).unwrap_or(1).max(1);
    let end = parts.next().and_then(row_of);
    (start, end)
}

#[async_trait]
impl TabularStore for MockTabularStore {
    async fn list_sheets(&self, _spreadsheet_id: &str) -> Result<Vec<String>> {
        let mut tables = self.lock();
        tables.calls.lists += 1;
        if self.fail_list {
            return Err(mock_failure("list", "*"));
        }
        Ok(tables.sheets.keys().cloned().collect())
    }

    async fn create_sheet(&self, _spreadsheet_id: &str, sheet: &str) -> Result<()> {
        let mut tables = self.lock();
        tables.calls.creates += 1;
        if self.fail_create {
            return Err(mock_failure("create", sheet));
        }
        if tables.sheets.contains_key(sheet) {
            return Err(PagetrackError::remote_status(400, format!("A sheet with the name \"{}\" already exists", sheet)));
        }
        tables.sheets.insert(sheet.to_string(), Vec::new());
        Ok(())
    }

    async fn read_rows(&self, _spreadsheet_id: &str, sheet: &str, cells: &str) -> Result<Vec<Vec<String>>> {
        let mut tables = self.lock();
        tables.calls.reads += 1;
        if self.fail_read {
            return Err(mock_failure("read", sheet));
        }
        let rows = tables
            .sheets
            .get(sheet)
            .ok_or_else(|| PagetrackError::remote_status(400, format!("Unable to parse range: {}!{}", sheet, cells)))?;

        let (start, end) = row_bounds(cells);
        let end = end.unwrap_or(rows.len()).min(rows.len());
        Ok(rows
            .get(start - 1..end)
            .map(<[Vec<String>]>::to_vec)
            .unwrap_or_default())
    }

    async fn write_row(&self, _spreadsheet_id: &str, sheet: &str, cells: &str, values: &[String]) -> Result<()> {
        let mut tables = self.lock();
        tables.calls.writes += 1;
        if self.fail_write {
            return Err(mock_failure("write", sheet));
        }
        let (start, _) = row_bounds(cells);
        let rows = tables
            .sheets
            .get_mut(sheet)
            .ok_or_else(|| PagetrackError::remote_status(400, format!("Unable to parse range: {}!{}", sheet, cells)))?;
        if rows.len() < start {
            rows.resize(start, Vec::new());
        }
        rows[start - 1] = values.to_vec();
        Ok(())
    }

    async fn append_row(&self, _spreadsheet_id: &str, sheet: &str, values: &[String]) -> Result<()> {
        let mut tables = self.lock();
        tables.calls.appends += 1;
        if self.fail_append {
            return Err(mock_failure("append", sheet));
        }
        let rows = tables
            .sheets
            .get_mut(sheet)
            .ok_or_else(|| PagetrackError::remote_status(400, format!("Unable to parse range: {}", sheet)))?;
        rows.push(values.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_bounds() {
        assert_eq!(row_bounds("A1:C1"), (1, Some(1)));
        assert_eq!(row_bounds("A2:C"), (2, None));
        assert_eq!(row_bounds("A1"), (1, None));
        assert_eq!(row_bounds("AA10:AB12"), (10, Some(12)));
    }

    #[tokio::test]
    async fn test_mock_tabular_store_roundtrip() {
        let store = MockTabularStore::new().with_sheet("CONFIG", vec![vec!["URL", "Folder", "Sheet"], vec!["u", "f", "s"]]);

        assert_eq!(store.list_sheets("id").await.unwrap(), vec!["CONFIG"]);
        let rows = store.read_rows("id", "CONFIG", "A2:C").await.unwrap();
        assert_eq!(rows, vec![vec!["u", "f", "s"]]);

        store.create_sheet("id", "Log").await.unwrap();
        assert!(store.read_rows("id", "Log", "A1:C1").await.unwrap().is_empty());

        let headers = vec!["a".to_string(), "b".to_string()];
        store.write_row("id", "Log", "A1", &headers).await.unwrap();
        store.append_row("id", "Log", &["1".to_string()]).await.unwrap();
        assert_eq!(store.rows("Log").unwrap(), vec![headers, vec!["1".to_string()]]);

        let calls = store.calls();
        assert_eq!(calls.mutations(), 3);
        assert_eq!(calls.reads, 2);
    }

    #[tokio::test]
    async fn test_mock_object_store_failing_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<html></html>").unwrap();
        let store = MockObjectStore::new().failing_content_type("text/html");

        assert!(store.upload(&path, "page.html", "F1", "text/html").await.is_err());
        let uploaded = store.upload(&path, "page.html", "F1", "text/plain").await.unwrap();
        assert_eq!(uploaded.link.as_deref(), Some("https://drive.mock/F1/page.html"));
        assert_eq!(store.uploads().len(), 2);
        assert_eq!(store.uploads()[0].size_bytes, 13);
    }
}
