//! These structs provide the CLI interface for the ledger bot.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;

/// ledger-bot: a Telegram expense tracker backed by a Google Sheet.
///
/// Send the bot a screenshot of a payment (Apple Pay, Touch n Go, GrabPay and
/// friends), review the extracted details, and it logs the transaction to a
/// per-month worksheet in your Google Sheet. Months can be summarized with
/// /stats and archived with /archive, all from the chat.
///
/// You will need a Google OAuth token for the Sheets API, a Telegram bot
/// token, and a key for the recognition service. Run `ledger-bot init` first
/// to set up the data directory.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration file.
    ///
    /// Decide what directory you want to store configuration in and pass this
    /// as --home (default $HOME/ledger-bot), then pass the URL of your ledger
    /// Google Sheet as --sheet-url and the recognition service endpoint as
    /// --recognizer-endpoint. After init, drop your Google OAuth token.json
    /// into the .secrets subdirectory.
    Init(InitArgs),

    /// Run the bot: poll the transport and handle events until interrupted.
    Run,

    /// Print the current month's spending statistics.
    Stats,

    /// List the active and archived monthly ledger partitions.
    Months,
}

#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The URL of the Google Sheet where the ledger is stored.
    #[arg(long)]
    sheet_url: String,

    /// The URL of the recognition service endpoint that turns screenshots
    /// into transaction JSON.
    #[arg(long)]
    recognizer_endpoint: String,
}

impl InitArgs {
    pub fn sheet_url(&self) -> &str {
        &self.sheet_url
    }

    pub fn recognizer_endpoint(&self) -> &str {
        &self.recognizer_endpoint
    }
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where ledger-bot data and configuration are held.
    /// Defaults to ~/ledger-bot
    #[arg(long, env = "LEDGER_BOT_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

fn default_home() -> DisplayPath {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ledger-bot")
        .into()
}

/// A `PathBuf` wrapper that implements `Display` so clap can show the default
/// value in help text.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DisplayPath(PathBuf);

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        Self(value)
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let args = Args::parse_from(["ledger-bot", "--log-level", "debug", "run"]);
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
        assert!(matches!(args.command(), Command::Run));
    }

    #[test]
    fn test_parse_init() {
        let args = Args::parse_from([
            "ledger-bot",
            "--home",
            "/tmp/ledger",
            "init",
            "--sheet-url",
            "https://docs.google.com/spreadsheets/d/abc",
            "--recognizer-endpoint",
            "https://recognizer.example.com/extract",
        ]);
        assert_eq!(args.common().home().path(), Path::new("/tmp/ledger"));
        let Command::Init(init) = args.command() else {
            panic!("expected init");
        };
        assert_eq!(init.sheet_url(), "https://docs.google.com/spreadsheets/d/abc");
    }
}
