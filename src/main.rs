use clap::Parser;
use ledger_bot::args::{Args, Command};
use ledger_bot::{commands, Config, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    // Route to the appropriate command handler
    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.sheet_url(), init_args.recognizer_endpoint())
                .await?
                .print()
        }

        Command::Run => commands::run(Config::load(home).await?).await?.print(),

        Command::Stats => commands::stats(Config::load(home).await?).await?.print(),

        Command::Months => commands::months(Config::load(home).await?).await?.print(),
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
