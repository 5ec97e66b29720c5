//! Google Sheets tabular store (REST v4)

use crate::auth::TokenSource;
use crate::store::TabularStore;
use async_trait::async_trait;
use pagetrack_core::{PagetrackError, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Sheets v4 client authenticated with a bearer token
#[derive(Debug, Clone)]
pub struct GoogleSheets {
    http: reqwest::Client,
    tokens: Arc<TokenSource>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetInfo {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Quote a sheet name into an A1 range, e.g. `'Log 1'!A1:C1`
pub fn a1_range(sheet: &str, cells: &str) -> String {
    let quoted = format!("'{}'", sheet.replace('\'', "''"));
    if cells.is_empty() {
        quoted
    } else {
        format!("{}!{}", quoted, cells)
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl GoogleSheets {
    pub fn new(http: reqwest::Client, tokens: Arc<TokenSource>) -> Self {
        Self {
            http,
            tokens,
            base_url: SHEETS_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Base URL extended by path segments, each percent-encoded on its own
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| PagetrackError::remote(format!("Invalid Sheets URL '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| PagetrackError::remote(format!("Sheets URL '{}' cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn spreadsheet_url(&self, spreadsheet_id: &str) -> Result<reqwest::Url> {
        self.endpoint(&[spreadsheet_id])
    }

    /// `{id}/values/{range}` with the range as one segment, so sheet names
    /// containing `#`, `?` or `/` stay inside the path
    fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<reqwest::Url> {
        self.endpoint(&[spreadsheet_id, "values", range])
    }

    /// Send a request and turn non-success statuses into remote errors
    async fn execute(&self, request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response> {
        tracing::debug!("Sheets request: {}", what);
        let token = self.tokens.bearer().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PagetrackError::remote(format!("Failed to send {} request: {}", what, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            return Err(PagetrackError::remote_status(
                status.as_u16(),
                format!("Sheets {} failed: {}", what, error_text),
            ));
        }
        Ok(response)
    }
}

#[async_trait]
impl TabularStore for GoogleSheets {
    async fn list_sheets(&self, spreadsheet_id: &str) -> Result<Vec<String>> {
        let request = self
            .http
            .get(self.spreadsheet_url(spreadsheet_id)?)
            .query(&[("fields", "sheets(properties(title))")]);
        let info: SpreadsheetInfo = self
            .execute(request, "list sheets")
            .await?
            .json()
            .await
            .map_err(|e| PagetrackError::remote(format!("Failed to parse spreadsheet info: {}", e)))?;

        Ok(info.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn create_sheet(&self, spreadsheet_id: &str, sheet: &str) -> Result<()> {
        let body = json!({
            "requests": [{ "addSheet": { "properties": { "title": sheet } } }]
        });
        let request = self
            .http
            .post(self.spreadsheet_url(&format!("{}:batchUpdate", spreadsheet_id))?)
            .json(&body);
        self.execute(request, "add sheet").await?;
        Ok(())
    }

    async fn read_rows(&self, spreadsheet_id: &str, sheet: &str, cells: &str) -> Result<Vec<Vec<String>>> {
        let request = self.http.get(self.values_url(spreadsheet_id, &a1_range(sheet, cells))?);
        let range: ValueRange = self
            .execute(request, "read values")
            .await?
            .json()
            .await
            .map_err(|e| PagetrackError::remote(format!("Failed to parse values: {}", e)))?;

        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    async fn write_row(&self, spreadsheet_id: &str, sheet: &str, cells: &str, values: &[String]) -> Result<()> {
        let request = self
            .http
            .put(self.values_url(spreadsheet_id, &a1_range(sheet, cells))?)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "values": [values] }));
        self.execute(request, "update values").await?;
        Ok(())
    }

    async fn append_row(&self, spreadsheet_id: &str, sheet: &str, values: &[String]) -> Result<()> {
        let url = self.values_url(spreadsheet_id, &format!("{}:append", a1_range(sheet, "A1")))?;
        let request = self
            .http
            .post(url)
            .query(&[("valueInputOption", "USER_ENTERED"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "values": [values] }));
        self.execute(request, "append values").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a1_range_quotes_sheet_names() {
        assert_eq!(a1_range("Sheet1", "A1:C1"), "'Sheet1'!A1:C1");
        assert_eq!(a1_range("Price Log", "A2:C"), "'Price Log'!A2:C");
        assert_eq!(a1_range("Bob's", "A1"), "'Bob''s'!A1");
        assert_eq!(a1_range("Sheet1", ""), "'Sheet1'");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!("x")), "x");
        assert_eq!(cell_text(&json!(42)), "42");
        assert_eq!(cell_text(&Value::Null), "");
    }

    #[test]
    fn test_value_range_without_values() {
        let parsed: ValueRange = serde_json::from_str(r#"{"range":"'Log'!A1:C1","majorDimension":"ROWS"}"#).unwrap();
        assert!(parsed.values.is_empty());
    }

    #[test]
    fn test_spreadsheet_info_parse() {
        let parsed: SpreadsheetInfo = serde_json::from_str(
            r#"{"sheets":[{"properties":{"title":"CONFIG"}},{"properties":{"title":"Sheet1"}}]}"#,
        )
        .unwrap();
        let titles: Vec<_> = parsed.sheets.into_iter().map(|s| s.properties.title).collect();
        assert_eq!(titles, vec!["CONFIG", "Sheet1"]);
    }

    fn local_sheets() -> GoogleSheets {
        let http = reqwest::Client::new();
        GoogleSheets::new(http.clone(), Arc::new(TokenSource::fixed(http, "t"))).with_base_url("http://localhost/v4")
    }

    #[test]
    fn test_urls() {
        let sheets = local_sheets();
        assert_eq!(sheets.spreadsheet_url("S").unwrap().as_str(), "http://localhost/v4/S");
        assert_eq!(
            sheets.spreadsheet_url("S:batchUpdate").unwrap().as_str(),
            "http://localhost/v4/S:batchUpdate"
        );
        assert_eq!(
            sheets.values_url("S", "'A'!A1").unwrap().as_str(),
            "http://localhost/v4/S/values/'A'!A1"
        );
    }

    #[test]
    fn test_values_url_keeps_sheet_names_in_one_segment() {
        let sheets = local_sheets();
        for name in ["Price #1", "Q?A", "A/B", "50% off"] {
            let url = sheets.values_url("S", &a1_range(name, "A1:C1")).unwrap();
            assert!(url.query().is_none(), "{} leaked into the query: {}", name, url);
            assert!(url.fragment().is_none(), "{} leaked into the fragment: {}", name, url);

            let segments: Vec<_> = url.path_segments().unwrap().collect();
            assert_eq!(segments.len(), 4, "{}", url);
            assert_eq!(&segments[..3], &["v4", "S", "values"]);
        }

        let url = sheets.values_url("S", &a1_range("Price #1", "A1:C1")).unwrap();
        assert_eq!(url.as_str(), "http://localhost/v4/S/values/'Price%20%231'!A1:C1");
    }

    #[test]
    fn test_append_url_suffix() {
        let sheets = local_sheets();
        let url = sheets.values_url("S", &format!("{}:append", a1_range("Q?A", "A1"))).unwrap();
        assert_eq!(url.as_str(), "http://localhost/v4/S/values/'Q%3FA'!A1:append");
    }

    #[test]
    fn test_trailing_slash_base_url() {
        let http = reqwest::Client::new();
        let sheets = GoogleSheets::new(http.clone(), Arc::new(TokenSource::fixed(http, "t")))
            .with_base_url("http://localhost/v4/");
        assert_eq!(sheets.spreadsheet_url("S").unwrap().as_str(), "http://localhost/v4/S");
    }
}
