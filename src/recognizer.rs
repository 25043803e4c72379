//! Client for the external recognition service that turns a payment
//! screenshot into a structured extraction.
//!
//! The service contract is narrow: it receives the raw image bytes and
//! answers with a JSON object carrying `amount`, `currency`, `merchant`,
//! `date`, `time`, `payment_method`, `category` and `description` keys, or an
//! `error` key when the screenshot could not be read.

use crate::model::Extraction;
use crate::Result;
use anyhow::Context;
use std::time::Duration;
use tracing::trace;

/// Turns image bytes into a structured extraction.
#[async_trait::async_trait]
pub(crate) trait Recognizer: Send + Sync {
    async fn extract(&self, image: &[u8]) -> Result<Extraction>;
}

/// Calls the recognition service over HTTP with a bearer key.
pub(crate) struct HttpRecognizer {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpRecognizer {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Unable to build the HTTP client")?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait::async_trait]
impl Recognizer for HttpRecognizer {
    async fn extract(&self, image: &[u8]) -> Result<Extraction> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, sniff_content_type(image))
            .body(image.to_vec())
            .send()
            .await
            .context("Failed to reach the recognition service")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            anyhow::bail!("Recognition service returned status {status}: {body}");
        }
        let text = response
            .text()
            .await
            .context("Failed to read the recognition response")?;
        trace!("recognition response: {text}");
        parse_extraction(&text)
    }
}

/// Parses the service response, tolerating a Markdown code fence around the
/// JSON object.
pub(crate) fn parse_extraction(text: &str) -> Result<Extraction> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(cleaned).context("The recognition response is not a valid extraction")
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Sniffs JPEG by its magic bytes; everything else is treated as PNG.
fn sniff_content_type(image: &[u8]) -> &'static str {
    if image.starts_with(&[0xff, 0xd8]) {
        "image/jpeg"
    } else {
        "image/png"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let extraction =
            parse_extraction(r#"{"amount": "45.50", "merchant": "Starbucks"}"#).unwrap();
        assert_eq!(extraction.merchant.as_deref(), Some("Starbucks"));
        assert!(extraction.error.is_none());
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "```json\n{\"amount\": \"45.50\"}\n```";
        let extraction = parse_extraction(text).unwrap();
        assert!(extraction.amount.is_some());

        let text = "```\n{\"amount\": \"45.50\"}\n```";
        assert!(parse_extraction(text).is_ok());
    }

    #[test]
    fn test_parse_error_marker() {
        let extraction = parse_extraction(r#"{"error": "not a receipt"}"#).unwrap();
        assert_eq!(extraction.error.as_deref(), Some("not a receipt"));
    }

    #[test]
    fn test_parse_garbage_is_an_error() {
        assert!(parse_extraction("I could not read that image, sorry!").is_err());
    }

    #[test]
    fn test_sniff_content_type() {
        assert_eq!(sniff_content_type(&[0xff, 0xd8, 0xff, 0xe0]), "image/jpeg");
        assert_eq!(sniff_content_type(&[0x89, b'P', b'N', b'G']), "image/png");
    }
}
