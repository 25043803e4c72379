//! Minimal Telegram Bot API client.
//!
//! Covers only the narrow surface the bot consumes: long-polled updates,
//! sending messages with inline keyboards, editing messages in place,
//! acknowledging callback queries, and downloading submitted photos. The
//! conversation core never sees these types; the run loop translates between
//! updates and [`Reply`] values.

use crate::chat::{Keyboard, Reply};
use crate::Result;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::trace;

const API_BASE: &str = "https://api.telegram.org";

pub(crate) struct TelegramBot {
    http: reqwest::Client,
    token: String,
    /// Long-poll wait, in seconds, passed to getUpdates.
    poll_timeout: u64,
    /// The next update id to request.
    offset: i64,
}

impl TelegramBot {
    pub fn new(token: &str, poll_timeout: Duration) -> Result<Self> {
        // The HTTP timeout must outlast the long poll itself.
        let http = reqwest::Client::builder()
            .timeout(poll_timeout + Duration::from_secs(10))
            .build()
            .context("Unable to build the HTTP client")?;
        Ok(Self {
            http,
            token: token.to_string(),
            poll_timeout: poll_timeout.as_secs(),
            offset: 0,
        })
    }

    /// Long-polls for the next batch of updates.
    pub async fn next_updates(&mut self) -> Result<Vec<Update>> {
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                json!({
                    "offset": self.offset,
                    "timeout": self.poll_timeout,
                    "allowed_updates": ["message", "callback_query"],
                }),
            )
            .await?;
        if let Some(last) = updates.last() {
            self.offset = last.update_id + 1;
        }
        Ok(updates)
    }

    /// Sends a reply, either editing `message_id` in place or as a new
    /// message.
    pub async fn deliver(&self, chat_id: i64, message_id: Option<i64>, reply: &Reply) -> Result<()> {
        match (reply.edit, message_id) {
            (true, Some(message_id)) => {
                self.edit_message(chat_id, message_id, &reply.text, reply.keyboard.as_ref())
                    .await
            }
            _ => {
                self.send_message(chat_id, &reply.text, reply.keyboard.as_ref())
                    .await
            }
        }
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        let mut params = json!({ "chat_id": chat_id, "text": text });
        if let Some(keyboard) = keyboard {
            params["reply_markup"] = inline_keyboard(keyboard);
        }
        let _: serde_json::Value = self.call("sendMessage", params).await?;
        Ok(())
    }

    pub async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        let mut params = json!({ "chat_id": chat_id, "message_id": message_id, "text": text });
        if let Some(keyboard) = keyboard {
            params["reply_markup"] = inline_keyboard(keyboard);
        }
        let _: serde_json::Value = self.call("editMessageText", params).await?;
        Ok(())
    }

    /// Acknowledges a callback query so the client stops showing a spinner.
    pub async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "answerCallbackQuery",
                json!({ "callback_query_id": callback_id }),
            )
            .await?;
        Ok(())
    }

    /// Resolves a photo's file id and downloads its bytes.
    pub async fn download_photo(&self, file_id: &str) -> Result<Vec<u8>> {
        let file: File = self.call("getFile", json!({ "file_id": file_id })).await?;
        let path = file
            .file_path
            .context("Telegram getFile returned no file_path")?;
        let url = format!("{API_BASE}/file/bot{}/{path}", self.token);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to download the photo")?;
        if !response.status().is_success() {
            anyhow::bail!(
                "Photo download failed with status {}",
                response.status()
            );
        }
        Ok(response
            .bytes()
            .await
            .context("Failed to read the photo bytes")?
            .to_vec())
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        trace!("Telegram call: {method}");
        let url = format!("{API_BASE}/bot{}/{method}", self.token);
        let response = self
            .http
            .post(&url)
            .json(&params)
            .send()
            .await
            .with_context(|| format!("Failed to call Telegram method {method}"))?;
        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse the {method} response"))?;
        if !envelope.ok {
            anyhow::bail!(
                "Telegram {method} failed: {}",
                envelope
                    .description
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        envelope
            .result
            .with_context(|| format!("Telegram {method} returned no result"))
    }
}

fn inline_keyboard(keyboard: &Keyboard) -> serde_json::Value {
    json!({
        "inline_keyboard": keyboard
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| json!({ "text": button.label, "callback_data": button.data }))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
    })
}

/// The standard Bot API response wrapper.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ApiEnvelope<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    /// Telegram sends several sizes of the same photo; the last is the
    /// largest.
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PhotoSize {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CallbackQuery {
    pub id: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct File {
    #[serde(default)]
    file_path: Option<String>,
}
