//! Top-level command dispatch.

use crate::chat::controller::ConversationController;
use crate::chat::{render, Reply};
use crate::error::Fault;
use crate::ledger::{label, LedgerService};
use crate::model::{CategoryRegistry, DraftTransaction};
use crate::recognizer::Recognizer;
use crate::session::UserId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// The slash commands surfaced to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Command {
    Start,
    Help,
    Categories,
    Stats,
    Archive,
    Months,
}

serde_plain::derive_display_from_serialize!(Command);
serde_plain::derive_fromstr_from_deserialize!(Command);

/// Extracts the bare command name from a message like `/stats@ledger_bot`,
/// tolerating trailing arguments. `None` when the text is not a command.
fn command_name(text: &str) -> Option<&str> {
    let first = text.trim().split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    Some(name.split('@').next().unwrap_or(name))
}

/// Dispatches inbound events to the controller and the ledger.
pub(crate) struct CommandRouter {
    controller: ConversationController,
    ledger: Arc<LedgerService>,
    recognizer: Box<dyn Recognizer>,
    registry: CategoryRegistry,
}

impl CommandRouter {
    pub fn new(
        ledger: Arc<LedgerService>,
        registry: CategoryRegistry,
        recognizer: Box<dyn Recognizer>,
    ) -> Self {
        Self {
            controller: ConversationController::new(ledger.clone(), registry),
            ledger,
            recognizer,
            registry,
        }
    }

    /// Handles a text message. Non-command chatter is ignored (`None`);
    /// unknown slash commands get a short hint.
    pub async fn text(&self, user: UserId, text: &str) -> Option<Reply> {
        let name = command_name(text)?;
        let command = match name.parse::<Command>() {
            Ok(command) => command,
            Err(_) => {
                debug!("User {user} sent unknown command '/{name}'");
                return Some(Reply::message(render::unknown_command_text()));
            }
        };
        debug!("User {user} sent {command:?}");
        let reply = match command {
            Command::Start => Reply::message(render::welcome()),
            Command::Help => Reply::message(render::help_text()),
            Command::Categories => Reply::message(render::categories_text(&self.registry)),
            Command::Stats => self.stats(user).await,
            Command::Archive => self.controller.archive_requested(user).await,
            Command::Months => self.months().await,
        };
        Some(reply)
    }

    /// Handles a photo submission: run recognition, build the draft and hand
    /// it to the controller.
    pub async fn photo(&self, user: UserId, image: &[u8]) -> Reply {
        let mut extraction = match self.recognizer.extract(image).await {
            Ok(extraction) => extraction,
            Err(e) => {
                return Reply::message(
                    Fault::ExtractionFailure(format!("Error processing image: {e:#}"))
                        .user_message(),
                )
            }
        };
        if let Some(error) = extraction.error.take() {
            return Reply::message(Fault::ExtractionFailure(error).user_message());
        }
        let today = chrono::Local::now().date_naive();
        match DraftTransaction::from_extraction(extraction, today, &self.registry) {
            Ok(draft) => self.controller.draft_received(user, draft).await,
            Err(e) => Reply::message(
                Fault::ExtractionFailure(format!("Error processing image: {e:#}")).user_message(),
            ),
        }
    }

    /// Handles a button press.
    pub async fn callback(&self, user: UserId, data: &str) -> Reply {
        self.controller.callback(user, data).await
    }

    async fn stats(&self, _user: UserId) -> Reply {
        let partition = label::for_date(chrono::Local::now().date_naive());
        match self.ledger.summary_if_exists(&partition).await {
            Ok(Some(summary)) if !summary.is_empty() => {
                Reply::message(render::stats_text(&partition, &summary))
            }
            Ok(_) => Reply::message(render::no_stats_text(&partition)),
            Err(e) => Reply::message(
                Fault::BackendUnavailable(format!("Error fetching statistics: {e:#}"))
                    .user_message(),
            ),
        }
    }

    async fn months(&self) -> Reply {
        match self.ledger.partitions().await {
            Ok(partitions) => Reply::message(render::months_text(&partitions)),
            Err(e) => {
                Reply::message(Fault::BackendUnavailable(format!("Error: {e:#}")).user_message())
            }
        }
    }
}
