use crate::api::{self, Mode};
use crate::chat::router::CommandRouter;
use crate::chat::{render, Reply};
use crate::commands::Out;
use crate::ledger::LedgerService;
use crate::model::CategoryRegistry;
use crate::recognizer::HttpRecognizer;
use crate::session::UserId;
use crate::telegram::{TelegramBot, Update};
use crate::{Config, Fault, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Starts the bot: polls the transport and handles events until interrupted
/// with Ctrl-C.
pub async fn run(config: Config) -> Result<Out<()>> {
    let mode = Mode::from_env();
    if mode == Mode::Test {
        warn!("LEDGER_BOT_IN_TEST_MODE is set; using the in-memory backend");
    }
    let sheet = api::worksheets(&config, mode).await?;
    let ledger = Arc::new(LedgerService::new(sheet));
    let recognizer = HttpRecognizer::new(
        config.recognizer_endpoint(),
        config.recognizer_key()?,
        config.backend_timeout(),
    )?;
    let router = CommandRouter::new(
        ledger,
        CategoryRegistry::standard(),
        Box::new(recognizer),
    );
    let mut bot = TelegramBot::new(config.telegram_token()?, config.poll_timeout())?;

    info!("Bot is starting");
    loop {
        let updates = tokio::select! {
            result = bot.next_updates() => match result {
                Ok(updates) => updates,
                Err(e) => {
                    error!("Failed to fetch updates: {e:#}");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        };

        // Updates are handled one at a time, which keeps same-user events in
        // arrival order; the per-user session lock backs this up if handling
        // is ever made concurrent.
        for update in updates {
            if let Err(e) = handle_update(&router, &bot, update).await {
                error!("Failed to handle an update: {e:#}");
            }
        }
    }
    Ok(Out::new_message("Bot stopped"))
}

async fn handle_update(router: &CommandRouter, bot: &TelegramBot, update: Update) -> Result<()> {
    debug!("Handling update {}", update.update_id);

    if let Some(message) = update.message {
        let user: UserId = message.chat.id;
        // The last photo size is the largest.
        if let Some(photo) = message.photo.last() {
            bot.send_message(user, &render::processing_text(), None)
                .await?;
            let reply = match bot.download_photo(&photo.file_id).await {
                Ok(image) => router.photo(user, &image).await,
                Err(e) => Reply::message(
                    Fault::ExtractionFailure(format!("Error processing image: {e:#}"))
                        .user_message(),
                ),
            };
            bot.deliver(user, None, &reply).await?;
        } else if let Some(text) = message.text.as_deref() {
            if let Some(reply) = router.text(user, text).await {
                bot.deliver(user, None, &reply).await?;
            }
        }
        return Ok(());
    }

    if let Some(callback) = update.callback_query {
        bot.answer_callback(&callback.id).await?;
        let Some(message) = callback.message else {
            warn!("Callback query {} carries no message; ignoring", callback.id);
            return Ok(());
        };
        let Some(data) = callback.data else {
            return Ok(());
        };
        let user: UserId = message.chat.id;
        let reply = router.callback(user, &data).await;
        bot.deliver(user, Some(message.message_id), &reply).await?;
    }
    Ok(())
}
