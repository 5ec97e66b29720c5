//! Google Drive object store
//!
//! Files go up through a resumable session: one POST carrying the metadata
//! opens the session, then one PUT to the returned `Location` sends the
//! bytes. Multipart requests are capped at 5 MB, which a full-height capture
//! can exceed.

use crate::auth::TokenSource;
use crate::store::{ObjectStore, UploadedObject};
use async_trait::async_trait;
use pagetrack_core::{PagetrackError, Result};
use reqwest::header::{HeaderMap, CONTENT_TYPE, LOCATION};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";

/// Drive v3 client authenticated with a bearer token
#[derive(Debug, Clone)]
pub struct GoogleDrive {
    http: reqwest::Client,
    tokens: Arc<TokenSource>,
    upload_url: String,
}

impl GoogleDrive {
    pub fn new(http: reqwest::Client, tokens: Arc<TokenSource>) -> Self {
        Self {
            http,
            tokens,
            upload_url: DRIVE_UPLOAD_URL.to_string(),
        }
    }

    /// Point uploads at a different endpoint
    pub fn with_upload_url(mut self, url: impl Into<String>) -> Self {
        self.upload_url = url.into();
        self
    }
}

/// Session URI from the response that opened a resumable upload
pub fn session_url(headers: &HeaderMap) -> Result<String> {
    let location = headers
        .get(LOCATION)
        .ok_or_else(|| PagetrackError::remote("Resumable upload response has no Location header"))?;
    let url = location
        .to_str()
        .map_err(|e| PagetrackError::remote(format!("Resumable upload Location is not valid text: {}", e)))?;
    if url.trim().is_empty() {
        return Err(PagetrackError::remote("Resumable upload Location is empty"));
    }
    Ok(url.to_string())
}

/// Extra guidance for common upload rejections
fn upload_hint(status: u16, container_id: &str) -> Option<String> {
    match status {
        404 => Some(format!("folder '{}' not found; check the folder id", container_id)),
        403 => Some(format!(
            "permission denied on folder '{}'; check that the account can write to it",
            container_id
        )),
        _ => None,
    }
}

async fn rejection(response: reqwest::Response, name: &str, container_id: &str) -> PagetrackError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown".to_string());
    let message = match upload_hint(status.as_u16(), container_id) {
        Some(hint) => format!("Drive upload of {} rejected: {} ({})", name, error_text, hint),
        None => format!("Drive upload of {} rejected: {}", name, error_text),
    };
    PagetrackError::remote_status(status.as_u16(), message)
}

#[async_trait]
impl ObjectStore for GoogleDrive {
    async fn upload(&self, path: &Path, name: &str, container_id: &str, content_type: &str) -> Result<UploadedObject> {
        let media = tokio::fs::read(path).await?;
        let metadata = json!({ "name": name, "parents": [container_id] });
        let token = self.tokens.bearer().await?;

        tracing::debug!("Uploading {} ({} bytes) to folder {}", name, media.len(), container_id);

        let response = self
            .http
            .post(&self.upload_url)
            .query(&[("uploadType", "resumable"), ("fields", "id,webViewLink")])
            .bearer_auth(&token)
            .header("X-Upload-Content-Type", content_type)
            .header("X-Upload-Content-Length", media.len().to_string())
            .json(&metadata)
            .send()
            .await
            .map_err(|e| PagetrackError::remote(format!("Failed to open upload session: {}", e)))?;
        if !response.status().is_success() {
            return Err(rejection(response, name, container_id).await);
        }
        let session = session_url(response.headers())?;

        let response = self
            .http
            .put(session)
            .bearer_auth(&token)
            .header(CONTENT_TYPE, content_type)
            .body(media)
            .send()
            .await
            .map_err(|e| PagetrackError::remote(format!("Failed to send upload bytes: {}", e)))?;
        if !response.status().is_success() {
            return Err(rejection(response, name, container_id).await);
        }

        response
            .json::<UploadedObject>()
            .await
            .map_err(|e| PagetrackError::remote(format!("Failed to parse upload response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_session_url_from_location() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LOCATION,
            HeaderValue::from_static("https://www.googleapis.com/upload/drive/v3/files?uploadType=resumable&upload_id=xa298sd"),
        );
        assert_eq!(
            session_url(&headers).unwrap(),
            "https://www.googleapis.com/upload/drive/v3/files?uploadType=resumable&upload_id=xa298sd"
        );
    }

    #[test]
    fn test_session_url_missing_or_unreadable() {
        let err = session_url(&HeaderMap::new()).unwrap_err();
        assert!(err.to_string().contains("no Location header"));

        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_bytes(b"https://x/\xff").unwrap());
        assert!(session_url(&headers).is_err());

        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static(""));
        assert!(session_url(&headers).unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_upload_hints() {
        assert!(upload_hint(404, "F1").unwrap().contains("F1"));
        assert!(upload_hint(403, "F1").unwrap().contains("permission"));
        assert!(upload_hint(500, "F1").is_none());
    }

    #[test]
    fn test_uploaded_object_parses_drive_response() {
        let parsed: UploadedObject =
            serde_json::from_str(r#"{"id":"abc","webViewLink":"https://drive.google.com/file/d/abc/view"}"#).unwrap();
        assert_eq!(parsed.id, "abc");
        assert_eq!(parsed.link.as_deref(), Some("https://drive.google.com/file/d/abc/view"));

        let bare: UploadedObject = serde_json::from_str(r#"{"id":"abc"}"#).unwrap();
        assert!(bare.link.is_none());
    }

    #[tokio::test]
    async fn test_upload_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let http = reqwest::Client::new();
        let drive = GoogleDrive::new(http.clone(), Arc::new(TokenSource::fixed(http, "token")));
        let err = drive
            .upload(&dir.path().join("absent.jpg"), "absent.jpg", "F1", "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, PagetrackError::Io(_)));
    }
}
