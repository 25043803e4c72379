use crate::api::{self, Mode};
use crate::chat::render;
use crate::commands::Out;
use crate::ledger::LedgerService;
use crate::{Config, Result};

/// Lists the active and archived monthly partitions without starting the bot.
pub async fn months(config: Config) -> Result<Out<serde_json::Value>> {
    let sheet = api::worksheets(&config, Mode::from_env()).await?;
    let ledger = LedgerService::new(sheet);
    let partitions = ledger.partitions().await?;
    let structure = serde_json::to_value(&partitions)?;
    Ok(Out::new(render::months_text(&partitions), structure))
}
