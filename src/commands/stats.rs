use crate::api::{self, Mode};
use crate::chat::render;
use crate::commands::Out;
use crate::ledger::{label, LedgerService};
use crate::{Config, Result};

/// Prints the current month's spending statistics without starting the bot.
pub async fn stats(config: Config) -> Result<Out<serde_json::Value>> {
    let sheet = api::worksheets(&config, Mode::from_env()).await?;
    let ledger = LedgerService::new(sheet);
    let partition = label::for_date(chrono::Local::now().date_naive());
    let summary = ledger.monthly_summary(&partition).await?;
    if summary.is_empty() {
        return Ok(Out::new_message(render::no_stats_text(&partition)));
    }
    let structure = serde_json::to_value(&summary)?;
    Ok(Out::new(render::stats_text(&partition, &summary), structure))
}
