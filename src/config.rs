//! Configuration file handling for the ledger bot.
//!
//! The configuration file is stored at `$LEDGER_BOT_HOME/config.json` and
//! contains the Google Sheet URL, the recognition service endpoint and call
//! timeouts. Credentials never live in the config file: the Google OAuth
//! token sits in `$LEDGER_BOT_HOME/.secrets/token.json`, while the Telegram
//! bot token and the recognition service key are injected from the
//! environment at load time.

use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "ledger-bot";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const TOKEN_JSON: &str = "token.json";
const CONFIG_JSON: &str = "config.json";

const TELEGRAM_TOKEN_ENV: &str = "LEDGER_BOT_TELEGRAM_TOKEN";
const RECOGNIZER_KEY_ENV: &str = "LEDGER_BOT_RECOGNIZER_KEY";

/// The `Config` object represents the configuration of the app. You
/// instantiate it by providing the path to `$LEDGER_BOT_HOME` and from there
/// it loads `$LEDGER_BOT_HOME/config.json`, resolves the secrets directory
/// and picks up credentials from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    spreadsheet_id: String,
    telegram_token: Option<String>,
    recognizer_key: Option<String>,
}

impl Config {
    /// Creates the data directory, its `.secrets` subdirectory and an initial
    /// `config.json` with default settings.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of the data directory,
    ///   e.g. `$HOME/ledger-bot`
    /// - `sheet_url` - The URL of the Google Sheet holding the ledger, e.g.
    ///   https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    /// - `recognizer_endpoint` - The URL of the recognition service that turns
    ///   screenshots into extractions
    pub async fn create(
        dir: impl Into<PathBuf>,
        sheet_url: &str,
        recognizer_endpoint: &str,
    ) -> Result<Self> {
        // Create the directory if it does not exist
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the ledger-bot home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            sheet_url: sheet_url.to_string(),
            recognizer_endpoint: recognizer_endpoint.to_string(),
            backend_timeout_secs: default_backend_timeout(),
            poll_timeout_secs: default_poll_timeout(),
            token_path: None,
        };
        config_file.save(&config_path).await?;

        let spreadsheet_id = extract_spreadsheet_id(sheet_url)
            .context("Failed to extract spreadsheet ID from sheet URL")?
            .to_string();

        Ok(Self {
            root,
            secrets,
            config_path,
            config_file,
            spreadsheet_id,
            telegram_token: env_credential(TELEGRAM_TOKEN_ENV),
            recognizer_key: env_credential(RECOGNIZER_KEY_ENV),
        })
    }

    /// This will
    /// - validate that the home directory and the config file exist
    /// - load the config file
    /// - validate that the secrets directory exists
    /// - pick up credentials from the environment
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Ledger-bot home is missing; run 'ledger-bot init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let spreadsheet_id = extract_spreadsheet_id(&config_file.sheet_url)
            .context("Failed to extract spreadsheet ID from sheet URL")?
            .to_string();

        let config = Self {
            secrets: root.join(SECRETS),
            root,
            config_path,
            config_file,
            spreadsheet_id,
            telegram_token: env_credential(TELEGRAM_TOKEN_ENV),
            recognizer_key: env_credential(RECOGNIZER_KEY_ENV),
        };
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn sheet_url(&self) -> &str {
        &self.config_file.sheet_url
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn recognizer_endpoint(&self) -> &str {
        &self.config_file.recognizer_endpoint
    }

    /// The bound on any single storage backend or recognition call.
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.config_file.backend_timeout_secs)
    }

    /// How long the transport long-poll waits for updates.
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.config_file.poll_timeout_secs)
    }

    /// Returns the stored `token_path` if it is absolute, otherwise resolves
    /// it relative to the home directory.
    pub fn token_path(&self) -> PathBuf {
        let p = self.config_file.token_path();
        if p.is_absolute() {
            p
        } else {
            self.root.join(p)
        }
    }

    /// The Telegram bot token from the environment.
    pub fn telegram_token(&self) -> Result<&str> {
        self.telegram_token
            .as_deref()
            .with_context(|| format!("Set {TELEGRAM_TOKEN_ENV} to the Telegram bot token"))
    }

    /// The recognition service API key from the environment.
    pub fn recognizer_key(&self) -> Result<&str> {
        self.recognizer_key
            .as_deref()
            .with_context(|| format!("Set {RECOGNIZER_KEY_ENV} to the recognition service key"))
    }
}

fn env_credential(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Represents the serialization and deserialization format of the
/// configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "ledger-bot",
///   "config_version": 1,
///   "sheet_url": "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL",
///   "recognizer_endpoint": "https://recognizer.example.com/extract",
///   "backend_timeout_secs": 30,
///   "poll_timeout_secs": 30
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "ledger-bot"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// URL of the ledger Google Sheet
    sheet_url: String,

    /// URL of the recognition service endpoint
    recognizer_endpoint: String,

    /// Bound, in seconds, on any single backend call
    #[serde(default = "default_backend_timeout")]
    backend_timeout_secs: u64,

    /// Long-poll wait, in seconds, for transport updates
    #[serde(default = "default_poll_timeout")]
    poll_timeout_secs: u64,

    /// Path to the OAuth token file (optional, relative to the home directory
    /// or absolute). Defaults to $LEDGER_BOT_HOME/.secrets/token.json
    #[serde(skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,
}

fn default_backend_timeout() -> u64 {
    30
}

fn default_poll_timeout() -> u64 {
    30
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        // Validate app_name
        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    /// Gets the token path. If the path is relative, it should be interpreted
    /// as relative to the home directory. If None, defaults to
    /// $LEDGER_BOT_HOME/.secrets/token.json
    pub fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(TOKEN_JSON))
    }
}

/// Extracts the spreadsheet ID from a Google Sheets URL
///
/// # Arguments
/// * `url` - The Google Sheets URL (e.g., "https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/...")
///
/// # Returns
/// The spreadsheet ID or an error if the URL format is invalid.
fn extract_spreadsheet_id(url: &str) -> Result<&str> {
    // URL format: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/...
    // or: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID?foo=bar
    let parts: Vec<&str> = url.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "d" && i + 1 < parts.len() {
            // Extract the ID and remove any query parameters or fragments
            let id_part = parts[i + 1];
            let id = id_part
                .split('?')
                .next()
                .unwrap_or(id_part)
                .split('#')
                .next()
                .unwrap_or(id_part);
            return Ok(id);
        }
    }
    Err(anyhow::anyhow!(
        "Invalid Google Sheets URL format. Expected: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID"
    ))
}
