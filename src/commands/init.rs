use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the data directory and the initial configuration.
pub async fn init(home: &Path, sheet_url: &str, recognizer_endpoint: &str) -> Result<Out<()>> {
    let config = Config::create(home, sheet_url, recognizer_endpoint).await?;
    Ok(Out::new_message(format!(
        "Initialized {root}.\n\
         Next steps:\n\
         - place your Google OAuth token at {token}\n\
         - export LEDGER_BOT_TELEGRAM_TOKEN with your bot token\n\
         - export LEDGER_BOT_RECOGNIZER_KEY with your recognition service key\n\
         - start the bot with 'ledger-bot run'",
        root = config.root().display(),
        token = config.token_path().display(),
    )))
}
