//! Implements the `Worksheets` trait using the `sheets::Client` to interact
//! with a Google sheet.
//!
//! Value reads go through the `sheets` crate. Worksheet-structure operations
//! (create, rename, reposition, header formatting) and row appends use the
//! Sheets REST endpoints directly, since the generated client does not cover
//! them well.

use crate::api::{TokenProvider, Worksheets};
use crate::{Config, Result};
use anyhow::Context;
use serde::Deserialize;
use sheets::types::{DateTimeRenderOption, Dimension, ValueRenderOption};
use sheets::ClientError;
use tracing::trace;

const SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Implements the `Worksheets` trait against a real Google spreadsheet. It
/// takes a `TokenProvider`, on which it calls refresh to keep the token
/// up-to-date.
pub(super) struct GoogleWorksheets {
    config: Config,
    token_provider: TokenProvider,
    client: sheets::Client,
    http: reqwest::Client,
}

impl GoogleWorksheets {
    pub(super) async fn new(config: Config) -> Result<Self> {
        let mut token_provider = TokenProvider::load(config.token_path()).await?;
        let client = create_sheets_client(&mut token_provider).await?;
        let http = reqwest::Client::builder()
            .timeout(config.backend_timeout())
            .build()
            .context("Unable to build the HTTP client")?;
        Ok(Self {
            config,
            token_provider,
            client,
            http,
        })
    }

    /// Refreshes the sheets client with a new access token if needed.
    async fn refresh_client(&mut self) -> Result<()> {
        self.client = create_sheets_client(&mut self.token_provider).await?;
        Ok(())
    }

    async fn bearer(&mut self) -> Result<String> {
        Ok(self.token_provider.token_with_refresh().await?.to_string())
    }

    /// The properties of every worksheet, in spreadsheet order.
    async fn sheet_properties(&mut self) -> Result<Vec<SheetProperties>> {
        let url = format!(
            "{SHEETS_ENDPOINT}/{}?fields=sheets.properties",
            self.config.spreadsheet_id()
        );
        let token = self.bearer().await?;
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to fetch spreadsheet metadata")?;
        let response = check_status(response).await?;
        let info: SpreadsheetInfo = response
            .json()
            .await
            .context("Failed to parse spreadsheet metadata")?;
        Ok(info.sheets.into_iter().map(|s| s.properties).collect())
    }

    async fn sheet_id(&mut self, title: &str) -> Result<i64> {
        self.sheet_properties()
            .await?
            .into_iter()
            .find(|p| p.title == title)
            .map(|p| p.sheet_id)
            .with_context(|| format!("Worksheet '{title}' not found"))
    }

    /// Posts a `batchUpdate` with the given request objects.
    async fn batch_update(&mut self, requests: Vec<serde_json::Value>) -> Result<()> {
        let url = format!(
            "{SHEETS_ENDPOINT}/{}:batchUpdate",
            self.config.spreadsheet_id()
        );
        let token = self.bearer().await?;
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "requests": requests }))
            .send()
            .await
            .context("Failed to send batchUpdate request")?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Worksheets for GoogleWorksheets {
    async fn list(&mut self) -> Result<Vec<String>> {
        trace!("list worksheets");
        let properties = self.sheet_properties().await?;
        Ok(properties.into_iter().map(|p| p.title).collect())
    }

    async fn read_rows(&mut self, title: &str) -> Result<Option<Vec<Vec<String>>>> {
        trace!("read_rows for {title}");
        // The values endpoint reports a missing worksheet as a generic range
        // error, so absence is detected from the worksheet listing instead and
        // surfaced as `None`.
        let titles = self.list().await?;
        if !titles.iter().any(|t| t == title) {
            return Ok(None);
        }

        self.refresh_client().await?;
        let range = format!("'{title}'!A:ZZ"); // Get all columns
        let response = tokio::time::timeout(
            self.config.backend_timeout(),
            self.client.spreadsheets().values_get(
                self.config.spreadsheet_id(),
                &range,
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            ),
        )
        .await
        .with_context(|| format!("Timed out fetching {title} sheet data"))?
        .map_err(map_client_error)
        .with_context(|| format!("Failed to fetch {title} sheet data"))?;
        Ok(Some(response.body.values))
    }

    async fn append_row(&mut self, title: &str, row: &[String]) -> Result<()> {
        trace!("append_row to {title}");
        let url = format!(
            "{SHEETS_ENDPOINT}/{}/values/'{title}'!A1:append?valueInputOption=USER_ENTERED",
            self.config.spreadsheet_id()
        );
        let token = self.bearer().await?;
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "values": [row] }))
            .send()
            .await
            .with_context(|| format!("Failed to append a row to worksheet '{title}'"))?;
        check_status(response).await?;
        Ok(())
    }

    async fn create(&mut self, title: &str, header: &[String]) -> Result<()> {
        trace!("create worksheet {title}");
        self.batch_update(vec![serde_json::json!({
            "addSheet": {
                "properties": {
                    "title": title,
                    "gridProperties": { "rowCount": 1000, "columnCount": 10 }
                }
            }
        })])
        .await
        .with_context(|| format!("Failed to create worksheet '{title}'"))?;

        self.append_row(title, header).await?;

        // One-time presentation setup: bold, centered header on a colored
        // background, and a frozen first row.
        let sheet_id = self.sheet_id(title).await?;
        self.batch_update(vec![
            serde_json::json!({
                "repeatCell": {
                    "range": { "sheetId": sheet_id, "startRowIndex": 0, "endRowIndex": 1 },
                    "cell": {
                        "userEnteredFormat": {
                            "textFormat": { "bold": true },
                            "backgroundColor": { "red": 0.29, "green": 0.53, "blue": 0.91 },
                            "horizontalAlignment": "CENTER"
                        }
                    },
                    "fields": "userEnteredFormat(textFormat,backgroundColor,horizontalAlignment)"
                }
            }),
            serde_json::json!({
                "updateSheetProperties": {
                    "properties": { "sheetId": sheet_id, "gridProperties": { "frozenRowCount": 1 } },
                    "fields": "gridProperties.frozenRowCount"
                }
            }),
        ])
        .await
        .with_context(|| format!("Failed to format the header of worksheet '{title}'"))
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        trace!("rename worksheet {from} -> {to}");
        let sheet_id = self.sheet_id(from).await?;
        self.batch_update(vec![serde_json::json!({
            "updateSheetProperties": {
                "properties": { "sheetId": sheet_id, "title": to },
                "fields": "title"
            }
        })])
        .await
        .with_context(|| format!("Failed to rename worksheet '{from}' to '{to}'"))
    }

    async fn move_to_end(&mut self, title: &str) -> Result<()> {
        trace!("move worksheet {title} to the end");
        let properties = self.sheet_properties().await?;
        let sheet_id = properties
            .iter()
            .find(|p| p.title == title)
            .map(|p| p.sheet_id)
            .with_context(|| format!("Worksheet '{title}' not found"))?;
        // Passing the worksheet count as the index moves the sheet after every
        // other sheet; the API clamps it into range.
        let end_index = properties.len();
        self.batch_update(vec![serde_json::json!({
            "updateSheetProperties": {
                "properties": { "sheetId": sheet_id, "index": end_index },
                "fields": "index"
            }
        })])
        .await
        .with_context(|| format!("Failed to reposition worksheet '{title}'"))
    }
}

/// Creates a new sheets client with a refreshed access token.
async fn create_sheets_client(token_provider: &mut TokenProvider) -> Result<sheets::Client> {
    // Get the access token (will refresh if needed)
    let access_token = token_provider.token_with_refresh().await?;

    // Create sheets client
    // Note: The sheets crate requires client_id, client_secret, and redirect_uri,
    // but we don't need them for API calls, only the access token
    Ok(sheets::Client::new(
        String::new(), // client_id (not needed for API calls with access token)
        String::new(), // client_secret (not needed for API calls with access token)
        String::new(), // redirect_uri (not needed for API calls with access token)
        access_token.to_string(),
        String::new(), // refresh_token (not needed, we handle refresh ourselves)
    ))
}

/// Fails with the response status and body when a REST call was rejected.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read response body".to_string());
    anyhow::bail!("Google Sheets API call failed with status {status}: {body}")
}

fn map_client_error(e: sheets::ClientError) -> anyhow::Error {
    let error_name = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken".to_string(),
        ClientError::FromUtf8Error(inner) => format!("FromUtf8Error {inner}"),
        ClientError::UrlParserError(inner) => format!("UrlParserError {inner}"),
        ClientError::SerdeJsonError(inner) => format!("SerdeJsonError {inner}"),
        ClientError::ReqwestError(inner) => format!("ReqwestError {inner}"),
        ClientError::InvalidHeaderValue(inner) => format!("InvalidHeaderValue {inner}"),
        ClientError::ReqwestMiddleWareError(inner) => format!("ReqwestMiddleWareError {inner}"),
        ClientError::HttpError { .. } => "HttpError".to_string(),
        ClientError::Other(_) => "Other".to_string(),
    };
    Err::<(), ClientError>(e).context(error_name).err().unwrap()
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
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}
