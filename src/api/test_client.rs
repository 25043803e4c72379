//! Implements the `Worksheets` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that
//! we can run the whole bot, top-to-bottom, without using Google Sheets.

use crate::api::Worksheets;
use crate::Result;
use anyhow::bail;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Mutex, OnceLock};

/// Process-global state for all test spreadsheets, keyed by spreadsheet id.
/// Each `TestWorksheets` handle is just a view onto this registry, so a test
/// can inspect the state a command mutated through its own handle.
static STATE: OnceLock<Mutex<HashMap<String, TestSheetState>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<String, TestSheetState>> {
    STATE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// The full state of one in-memory spreadsheet.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct TestSheetState {
    /// Worksheets in spreadsheet order.
    pub worksheets: Vec<TestWorksheetState>,
    /// When set, every backend call fails with this message. Used to exercise
    /// backend-unavailable paths.
    pub fail_message: Option<String>,
}

impl TestSheetState {
    pub fn worksheet(&self, title: &str) -> Option<&TestWorksheetState> {
        self.worksheets.iter().find(|ws| ws.title == title)
    }

    pub fn titles(&self) -> Vec<String> {
        self.worksheets.iter().map(|ws| ws.title.clone()).collect()
    }
}

/// One in-memory worksheet.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct TestWorksheetState {
    pub title: String,
    pub rows: Vec<Vec<String>>,
    pub frozen_header: bool,
}

/// An implementation of the `Worksheets` trait that does not use Google
/// Sheets.
pub(crate) struct TestWorksheets {
    spreadsheet_id: String,
}

impl TestWorksheets {
    pub fn new(spreadsheet_id: &str) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.to_string(),
        }
    }

    /// Creates a handle, seeding the spreadsheet with one demo month when it
    /// has no state yet. Used by test mode so the bot has data to show.
    pub fn seeded(spreadsheet_id: &str) -> Self {
        let handle = Self::new(spreadsheet_id);
        let mut map = registry().lock().unwrap();
        map.entry(spreadsheet_id.to_string()).or_insert_with(|| {
            let rows = rows_from_csv(SEED_DATA).expect("seed data is valid CSV");
            TestSheetState {
                worksheets: vec![TestWorksheetState {
                    title: "2025-01 January".to_string(),
                    rows,
                    frozen_header: true,
                }],
                fail_message: None,
            }
        });
        drop(map);
        handle
    }

    /// Gets a copy of the current state of this spreadsheet.
    #[cfg(test)]
    pub fn get_state(&self) -> TestSheetState {
        registry()
            .lock()
            .unwrap()
            .get(&self.spreadsheet_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Replaces the state of this spreadsheet.
    #[cfg(test)]
    pub fn set_state(&self, state: TestSheetState) {
        registry()
            .lock()
            .unwrap()
            .insert(self.spreadsheet_id.clone(), state);
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut TestSheetState) -> Result<T>) -> Result<T> {
        let mut map = registry().lock().unwrap();
        let state = map.entry(self.spreadsheet_id.clone()).or_default();
        if let Some(message) = &state.fail_message {
            bail!("{message}");
        }
        f(state)
    }
}

#[async_trait::async_trait]
impl Worksheets for TestWorksheets {
    async fn list(&mut self) -> Result<Vec<String>> {
        self.with_state(|state| Ok(state.titles()))
    }

    async fn read_rows(&mut self, title: &str) -> Result<Option<Vec<Vec<String>>>> {
        self.with_state(|state| Ok(state.worksheet(title).map(|ws| ws.rows.clone())))
    }

    async fn append_row(&mut self, title: &str, row: &[String]) -> Result<()> {
        self.with_state(|state| {
            let ws = state
                .worksheets
                .iter_mut()
                .find(|ws| ws.title == title)
                .ok_or_else(|| anyhow::anyhow!("Worksheet '{title}' not found"))?;
            ws.rows.push(row.to_vec());
            Ok(())
        })
    }

    async fn create(&mut self, title: &str, header: &[String]) -> Result<()> {
        self.with_state(|state| {
            if state.worksheet(title).is_some() {
                bail!("Worksheet '{title}' already exists");
            }
            state.worksheets.push(TestWorksheetState {
                title: title.to_string(),
                rows: vec![header.to_vec()],
                frozen_header: true,
            });
            Ok(())
        })
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        self.with_state(|state| {
            if state.worksheet(to).is_some() {
                bail!("Worksheet '{to}' already exists");
            }
            let ws = state
                .worksheets
                .iter_mut()
                .find(|ws| ws.title == from)
                .ok_or_else(|| anyhow::anyhow!("Worksheet '{from}' not found"))?;
            ws.title = to.to_string();
            Ok(())
        })
    }

    async fn move_to_end(&mut self, title: &str) -> Result<()> {
        self.with_state(|state| {
            let position = state
                .worksheets
                .iter()
                .position(|ws| ws.title == title)
                .ok_or_else(|| anyhow::anyhow!("Worksheet '{title}' not found"))?;
            let ws = state.worksheets.remove(position);
            state.worksheets.push(ws);
            Ok(())
        })
    }
}

/// Loads worksheet rows from a CSV-formatted string. Used to seed fixtures.
pub(crate) fn rows_from_csv(csv_data: &str) -> Result<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false) // Ensure headers are treated as part of the data
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }
    Ok(rows)
}

/// Seed data for the demo month.
const SEED_DATA: &str = r##"Date,Time,Merchant,Category,Amount,Currency,Payment Method,Description,Logged At
2025-01-04,08:12,Starbucks,☕ Coffee/Drinks,6.75,MYR,Apple Pay,flat white,2025-01-04 08:15:02
2025-01-05,,Village Grocer,🏪 Groceries,87.43,MYR,Credit Card,weekly shop,2025-01-05 19:02:44
2025-01-07,12:35,Chipotle,🍔 Food & Dining,14.85,MYR,GrabPay,lunch,2025-01-07 12:40:19
2025-01-09,18:05,Shell,⛽ Fuel,52.30,MYR,Touch n Go,full tank,2025-01-09 18:06:31
2025-01-12,,Netflix,📱 Subscriptions,54.90,MYR,Credit Card,monthly plan,2025-01-12 09:00:12
"##;

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(name: &str) -> TestWorksheets {
        let handle = TestWorksheets::new(name);
        handle.set_state(TestSheetState::default());
        handle
    }

    #[tokio::test]
    async fn test_create_and_append() {
        let mut sheet = handle("test-client-create");
        sheet
            .create("2025-01 January", &["A".to_string(), "B".to_string()])
            .await
            .unwrap();
        sheet
            .append_row(
                "2025-01 January",
                &["1".to_string(), "2".to_string()],
            )
            .await
            .unwrap();

        let rows = sheet.read_rows("2025-01 January").await.unwrap().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["1", "2"]);
        assert!(sheet.get_state().worksheet("2025-01 January").unwrap().frozen_header);
    }

    #[tokio::test]
    async fn test_read_missing_worksheet_is_none() {
        let mut sheet = handle("test-client-missing");
        assert!(sheet.read_rows("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rename_and_move_to_end() {
        let mut sheet = handle("test-client-rename");
        sheet.create("a", &["h".to_string()]).await.unwrap();
        sheet.create("b", &["h".to_string()]).await.unwrap();
        sheet.rename("a", "z").await.unwrap();
        sheet.move_to_end("z").await.unwrap();
        assert_eq!(sheet.list().await.unwrap(), vec!["b", "z"]);
    }

    #[tokio::test]
    async fn test_fail_message_fails_every_call() {
        let mut sheet = handle("test-client-fail");
        sheet.set_state(TestSheetState {
            fail_message: Some("backend down".to_string()),
            ..TestSheetState::default()
        });
        let err = sheet.list().await.unwrap_err();
        assert!(err.to_string().contains("backend down"));
    }

    #[test]
    fn test_rows_from_csv() {
        let rows = rows_from_csv("a,b\n1,2\n").unwrap();
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[tokio::test]
    async fn test_seeded_handle_has_the_demo_month() {
        let mut sheet = TestWorksheets::seeded("test-client-seeded");
        assert_eq!(sheet.list().await.unwrap(), vec!["2025-01 January"]);
        let rows = sheet.read_rows("2025-01 January").await.unwrap().unwrap();
        assert_eq!(rows[0][0], "Date");
        assert_eq!(rows.len(), 6);
    }
}
