//! Authentication for Google Drive and Sheets
//!
//! Supports two sources, in priority order:
//! 1. PAGETRACK_ACCESS_TOKEN - a ready bearer token
//! 2. An authorized-user token file (`token.json`), refreshed whenever the
//!    token is about to expire, including mid-batch
//!
//! The interactive consent flow that produces the token file is not handled
//! here; the file must already exist.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use pagetrack_core::{PagetrackError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Environment variable holding a ready bearer token
pub const ACCESS_TOKEN_ENV: &str = "PAGETRACK_ACCESS_TOKEN";

/// Google OAuth token endpoint
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

// Tokens this close to expiry are refreshed up front
const EXPIRY_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Authorized-user credentials as stored in the token file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUser {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    /// Fields this crate does not read (scopes, account), preserved on save
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl AuthorizedUser {
    /// Load credentials from a token file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PagetrackError::Auth(format!(
                "Token file '{}' not found. Authorize the Google account first.",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            PagetrackError::Auth(format!("Invalid token file '{}': {}", path.display(), e))
        })
    }

    /// Persist credentials back to the token file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// The stored access token, if it is present and not about to expire
    pub fn valid_token(&self, now: DateTime<Utc>) -> Option<&str> {
        let token = self.token.as_deref().filter(|t| !t.is_empty())?;
        match self.expiry {
            Some(expiry) if expiry <= now + ChronoDuration::seconds(EXPIRY_MARGIN_SECS) => None,
            _ => Some(token),
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }

    /// Exchange the refresh token for a new access token
    pub async fn refresh(&mut self, http: &reqwest::Client) -> Result<()> {
        let (Some(refresh_token), Some(client_id), Some(client_secret)) =
            (&self.refresh_token, &self.client_id, &self.client_secret)
        else {
            return Err(PagetrackError::Auth(
                "Token file has no refresh credentials".to_string(),
            ));
        };

        tracing::info!("Refreshing expired token");
        let response = http
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PagetrackError::Auth(format!("Failed to send refresh request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unknown".to_string());
            return Err(PagetrackError::Auth(format!(
                "Token refresh rejected ({}): {}",
                status, body
            )));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| PagetrackError::Auth(format!("Failed to parse refresh response: {}", e)))?;

        self.token = Some(refreshed.access_token);
        self.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + ChronoDuration::seconds(secs));
        Ok(())
    }
}

/// Bearer token from the environment, if set
pub fn token_from_env() -> Option<String> {
    env::var(ACCESS_TOKEN_ENV).ok().filter(|t| !t.trim().is_empty())
}

/// Describe when a bearer token stops working, for the batch-start log
pub fn describe_expiry(expiry: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match expiry {
        Some(at) if at <= now => format!("expired at {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        Some(at) => format!(
            "valid until {} ({} minutes left)",
            at.format("%Y-%m-%d %H:%M:%S UTC"),
            (at - now).num_minutes()
        ),
        None => "expiry unknown".to_string(),
    }
}

enum TokenKind {
    /// Taken from PAGETRACK_ACCESS_TOKEN; never refreshed
    Fixed(String),
    /// Token file credentials, refreshed in place when near expiry
    File {
        path: PathBuf,
        user: Mutex<AuthorizedUser>,
    },
}

/// Bearer tokens for the Google APIs, shared by every client in a batch
///
/// Priority:
/// 1. PAGETRACK_ACCESS_TOKEN
/// 2. The token file, refreshed and rewritten whenever the stored token is
///    missing or about to expire
pub struct TokenSource {
    http: reqwest::Client,
    kind: TokenKind,
}

impl TokenSource {
    /// A constant token
    pub fn fixed(http: reqwest::Client, token: impl Into<String>) -> Self {
        Self {
            http,
            kind: TokenKind::Fixed(token.into()),
        }
    }

    /// Token from the environment, otherwise from the token file
    ///
    /// Fails up front if the file token is unusable and cannot be refreshed.
    pub async fn connect(http: reqwest::Client, token_file: &Path) -> Result<Self> {
        if let Some(token) = token_from_env() {
            tracing::info!("Using {}", ACCESS_TOKEN_ENV);
            return Ok(Self::fixed(http, token));
        }

        let user = AuthorizedUser::load(token_file)?;
        tracing::info!("Using token file {}", token_file.display());
        let source = Self {
            http,
            kind: TokenKind::File {
                path: token_file.to_path_buf(),
                user: Mutex::new(user),
            },
        };
        source.bearer().await?;
        Ok(source)
    }

    /// Expiry of the current token, if known
    pub async fn expiry(&self) -> Option<DateTime<Utc>> {
        match &self.kind {
            TokenKind::Fixed(_) => None,
            TokenKind::File { user, .. } => user.lock().await.expiry,
        }
    }

    /// A token that is valid now, refreshing it first if needed
    pub async fn bearer(&self) -> Result<String> {
        let (path, user) = match &self.kind {
            TokenKind::Fixed(token) => return Ok(token.clone()),
            TokenKind::File { path, user } => (path, user),
        };

        let mut user = user.lock().await;
        if let Some(token) = user.valid_token(Utc::now()) {
            return Ok(token.to_string());
        }

        if !user.can_refresh() {
            return Err(PagetrackError::Auth(format!(
                "Token in '{}' is missing or expired and cannot be refreshed",
                path.display()
            )));
        }

        user.refresh(&self.http).await?;
        if let Err(e) = user.save(path) {
            tracing::warn!("Could not persist refreshed token to {}: {}", path.display(), e);
        }

        user.token
            .clone()
            .ok_or_else(|| PagetrackError::Auth("Refresh returned no token".to_string()))
    }
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match &self.kind {
            TokenKind::Fixed(_) => "fixed".to_string(),
            TokenKind::File { path, .. } => path.display().to_string(),
        };
        f.debug_struct("TokenSource").field("source", &source).finish_non_exhaustive()
    }
}
