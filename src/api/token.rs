//! OAuth token handling for the Google Sheets API.
//!
//! The interactive consent flow is not part of this program; `token.json` is
//! provisioned out of band and placed in `$LEDGER_BOT_HOME/.secrets/`. This
//! module loads it and keeps the access token fresh via the refresh grant.

use crate::{utils, Result};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the recorded expiry so a token does not die
/// mid-call.
const EXPIRY_MARGIN_SECONDS: i64 = 60;

/// The serialization format of `token.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct TokenFile {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub client_id: String,
    pub client_secret: String,
    /// Instant after which `access_token` is considered stale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

/// Loads `token.json` and refreshes the access token when it has expired.
pub(crate) struct TokenProvider {
    path: PathBuf,
    file: TokenFile,
    http: reqwest::Client,
}

impl TokenProvider {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file: TokenFile = utils::deserialize(&path)
            .await
            .context("Unable to load the Google OAuth token file")?;
        Ok(Self {
            path,
            file,
            http: reqwest::Client::new(),
        })
    }

    /// The access token, refreshed first if it is at or near expiry.
    pub async fn token_with_refresh(&mut self) -> Result<&str> {
        if self.is_stale() {
            self.refresh().await?;
        }
        Ok(&self.file.access_token)
    }

    fn is_stale(&self) -> bool {
        match self.file.expiry {
            Some(expiry) => Utc::now() + chrono::Duration::seconds(EXPIRY_MARGIN_SECONDS) >= expiry,
            // No recorded expiry: assume the token is usable and let the API
            // reject it if not.
            None => false,
        }
    }

    async fn refresh(&mut self) -> Result<()> {
        let refresh_token = self.file.refresh_token.as_deref().context(
            "The Google access token is expired and token.json has no refresh_token to renew it",
        )?;
        debug!("Refreshing the Google access token");

        let params = [
            ("client_id", self.file.client_id.as_str()),
            ("client_secret", self.file.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&params)
            .send()
            .await
            .context("Failed to reach the Google OAuth token endpoint")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            anyhow::bail!("Token refresh failed with status {status}: {body}");
        }
        let refreshed: RefreshResponse = response
            .json()
            .await
            .context("Failed to parse the token refresh response")?;

        self.file.access_token = refreshed.access_token;
        self.file.expiry = Some(Utc::now() + chrono::Duration::seconds(refreshed.expires_in));
        self.save().await
    }

    async fn save(&self) -> Result<()> {
        let content =
            serde_json::to_string_pretty(&self.file).context("Failed to serialize token")?;
        utils::write(&self.path, content).await?;

        // token.json holds credentials; restrict it to the owner.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, permissions)
                .with_context(|| format!("Failed to set permissions on {}", self.path.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
}
