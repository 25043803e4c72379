//! Spreadsheet backend access.
//!
//! The ledger consumes a deliberately narrow slice of the storage backend:
//! list worksheets, read all rows, append a row, create a worksheet with a
//! fixed header, rename, and move to the end. `Worksheets` captures exactly
//! that surface; everything else about the spreadsheet is out of scope.

mod google;
pub(crate) mod test_client;
mod token;

use crate::{Config, Result};
use test_client::TestWorksheets;

pub(crate) use token::TokenProvider;

/// The worksheet operations consumed by the ledger.
#[async_trait::async_trait]
pub(crate) trait Worksheets {
    /// Worksheet titles in their current spreadsheet order.
    async fn list(&mut self) -> Result<Vec<String>>;

    /// All rows of the named worksheet, or `None` when it does not exist.
    /// A missing worksheet is an ordinary outcome here, not an error.
    async fn read_rows(&mut self, title: &str) -> Result<Option<Vec<Vec<String>>>>;

    /// Appends one row after the existing data of the named worksheet.
    async fn append_row(&mut self, title: &str, row: &[String]) -> Result<()>;

    /// Creates a worksheet with `header` as a bold, frozen first row.
    async fn create(&mut self, title: &str, header: &[String]) -> Result<()>;

    /// Renames a worksheet.
    async fn rename(&mut self, from: &str, to: &str) -> Result<()>;

    /// Repositions the named worksheet after every other worksheet.
    async fn move_to_end(&mut self, title: &str) -> Result<()>;
}

/// Selects between the Google Sheets backend and the in-memory test backend.
///
/// When `LEDGER_BOT_IN_TEST_MODE` is set and non-zero in length the mode is
/// `Mode::Test`, which allows running the whole bot, top-to-bottom, without
/// touching the Google APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Google,
    Test,
}

impl Mode {
    pub fn from_env() -> Self {
        match std::env::var("LEDGER_BOT_IN_TEST_MODE") {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Google,
        }
    }
}

/// Creates the worksheet backend for `mode`.
pub(crate) async fn worksheets(config: &Config, mode: Mode) -> Result<Box<dyn Worksheets + Send>> {
    match mode {
        Mode::Google => Ok(Box::new(
            google::GoogleWorksheets::new(config.clone()).await?,
        )),
        Mode::Test => Ok(Box::new(TestWorksheets::seeded(config.spreadsheet_id()))),
    }
}
