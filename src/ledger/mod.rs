//! The monthly ledger: partition resolution, commits, aggregation and
//! archival.

pub(crate) mod label;

use crate::api::Worksheets;
use crate::model::{Amount, DraftTransaction, LedgerRow, AMOUNT_COL, CATEGORY_COL, HEADER};
use crate::Result;
use anyhow::{bail, Context};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Owns the worksheet backend and enforces the partition lifecycle rules.
///
/// Partition mutation is serialized per label: the per-label lock is held for
/// the duration of any append or archive, so two commits into the same month
/// cannot interleave and an archive cannot run concurrently with a commit
/// targeting the same label.
pub(crate) struct LedgerService {
    sheet: Mutex<Box<dyn Worksheets + Send>>,
    partition_locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LedgerService {
    pub fn new(sheet: Box<dyn Worksheets + Send>) -> Self {
        Self {
            sheet: Mutex::new(sheet),
            partition_locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    fn partition_lock(&self, partition: &str) -> Arc<Mutex<()>> {
        let mut locks = self.partition_locks.lock().unwrap();
        locks.entry(partition.to_string()).or_default().clone()
    }

    /// Resolves `date` to its month partition, creating the worksheet with the
    /// fixed header schema on first use. Resolving the same month twice
    /// returns the same partition. An archived partition is never resolved; a
    /// date in an archived month gets a fresh, active partition.
    pub async fn resolve_partition(&self, date: NaiveDate) -> Result<String> {
        let partition = label::for_date(date);
        let lock = self.partition_lock(&partition);
        let _guard = lock.lock().await;
        let mut sheet = self.sheet.lock().await;
        ensure_partition(sheet.as_mut(), &partition).await?;
        Ok(partition)
    }

    /// Appends the committed form of `draft` to the partition of the draft's
    /// own transaction date (a backdated draft goes into its own month). The
    /// caller must not clear the draft unless this returns `Ok`.
    pub async fn commit(&self, draft: &DraftTransaction) -> Result<LedgerRow> {
        let partition = self.resolve_partition(draft.date()).await?;
        let lock = self.partition_lock(&partition);
        let _guard = lock.lock().await;
        let mut sheet = self.sheet.lock().await;

        let row = LedgerRow::from_draft(draft, chrono::Local::now().naive_local());
        sheet
            .append_row(&partition, &row.to_cells())
            .await
            .with_context(|| format!("Failed to append the transaction to '{partition}'"))?;
        debug!(
            "Committed {} {} at '{}' into '{partition}'",
            row.currency,
            row.amount.display_2dp(),
            row.merchant
        );
        Ok(row)
    }

    /// The summary of the named partition, or `None` when no such worksheet
    /// exists.
    pub async fn summary_if_exists(&self, partition: &str) -> Result<Option<Summary>> {
        let mut sheet = self.sheet.lock().await;
        let rows = match sheet.read_rows(partition).await? {
            Some(rows) => rows,
            None => return Ok(None),
        };
        Ok(Some(Summary::from_rows(&rows)))
    }

    /// The summary of the named partition. A missing partition is an empty
    /// summary, not an error.
    pub async fn monthly_summary(&self, partition: &str) -> Result<Summary> {
        Ok(self
            .summary_if_exists(partition)
            .await?
            .unwrap_or_default())
    }

    /// Archives the named partition: renames it with the `[ARCHIVED] ` prefix
    /// and repositions it after every other worksheet. Archiving an
    /// already-archived partition returns success without modification. A
    /// failure between rename and reposition is reported and not retried.
    pub async fn archive(&self, target: &str) -> Result<ArchiveOutcome> {
        let lock = self.partition_lock(target);
        let _guard = lock.lock().await;
        let mut sheet = self.sheet.lock().await;

        let titles = sheet.list().await?;
        let archived_title = label::archived(target);
        let target_exists = titles.iter().any(|t| t == target);
        if !target_exists {
            if titles.iter().any(|t| *t == archived_title) {
                debug!("Partition '{target}' is already archived");
                return Ok(ArchiveOutcome::AlreadyArchived);
            }
            bail!("No worksheet found for {target}");
        }

        sheet
            .rename(target, &archived_title)
            .await
            .with_context(|| format!("Failed to archive '{target}'"))?;
        sheet.move_to_end(&archived_title).await.with_context(|| {
            format!("'{target}' was renamed but could not be moved to the end of the sheets")
        })?;
        info!("Archived ledger partition '{target}'");
        Ok(ArchiveOutcome::Archived)
    }

    /// All known partitions, split into active and archived.
    pub async fn partitions(&self) -> Result<Partitions> {
        let mut sheet = self.sheet.lock().await;
        let titles = sheet.list().await?;
        let mut partitions = Partitions::default();
        for title in titles {
            if let Some(plain) = label::strip_archived(&title) {
                partitions.archived.push(plain.to_string());
            } else if label::is_month_label(&title) {
                partitions.active.push(title);
            }
        }
        Ok(partitions)
    }
}

/// Creates the worksheet for `partition` if it does not exist yet.
async fn ensure_partition(sheet: &mut (dyn Worksheets + Send), partition: &str) -> Result<()> {
    let titles = sheet.list().await?;
    if !titles.iter().any(|t| t == partition) {
        info!("Creating ledger partition '{partition}'");
        let header: Vec<String> = HEADER.iter().map(|h| h.to_string()).collect();
        sheet.create(partition, &header).await?;
    }
    Ok(())
}

/// The outcome of an archive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArchiveOutcome {
    Archived,
    AlreadyArchived,
}

/// Known partitions split by archive status.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Partitions {
    pub active: Vec<String>,
    pub archived: Vec<String>,
}

/// Aggregated statistics over one partition's rows.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub(crate) struct Summary {
    count: usize,
    total: Decimal,
    /// Totals per category, in first-encountered row order.
    per_category: Vec<(String, Decimal)>,
}

impl Summary {
    /// Aggregates raw worksheet rows. The first row is the header; amounts
    /// that fail to parse count as zero.
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let mut summary = Summary::default();
        for row in rows.iter().skip(1) {
            if row.is_empty() {
                continue;
            }
            let amount = row
                .get(AMOUNT_COL)
                .map(|cell| Amount::parse_lenient(cell))
                .unwrap_or_default()
                .value();
            let category = row.get(CATEGORY_COL).cloned().unwrap_or_default();
            summary.count += 1;
            summary.total += amount;
            match summary
                .per_category
                .iter_mut()
                .find(|(name, _)| *name == category)
            {
                Some((_, total)) => *total += amount,
                None => summary.per_category.push((category, amount)),
            }
        }
        summary
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Average per transaction; zero when the partition is empty.
    pub fn average(&self) -> Decimal {
        if self.count == 0 {
            Decimal::ZERO
        } else {
            self.total / Decimal::from(self.count as u64)
        }
    }

    /// The top `n` categories by total, descending. Ties keep the
    /// first-encountered order of the underlying rows (the sort is stable).
    pub fn top_categories(&self, n: usize) -> Vec<(&str, Decimal)> {
        let mut ranked: Vec<(&str, Decimal)> = self
            .per_category
            .iter()
            .map(|(name, total)| (name.as_str(), *total))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    /// A category total as a share of the grand total, in percent.
    pub fn percentage(&self, amount: Decimal) -> Decimal {
        if self.total.is_zero() {
            Decimal::ZERO
        } else {
            amount * Decimal::from(100u32) / self.total
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_client::{TestSheetState, TestWorksheetState, TestWorksheets};
    use crate::model::{CategoryRegistry, DraftTransaction, Extraction};
    use chrono::NaiveDateTime;
    use std::str::FromStr;

    fn service(spreadsheet_id: &str) -> (LedgerService, TestWorksheets) {
        let handle = TestWorksheets::new(spreadsheet_id);
        handle.set_state(TestSheetState::default());
        let service = LedgerService::new(Box::new(TestWorksheets::new(spreadsheet_id)));
        (service, handle)
    }

    fn draft(amount: &str, category: &str, date: &str, merchant: &str) -> DraftTransaction {
        let registry = CategoryRegistry::standard();
        let extraction: Extraction = serde_json::from_str(&format!(
            r#"{{"amount": "{amount}", "currency": "MYR", "merchant": "{merchant}",
                "date": "{date}", "category": "{category}"}}"#
        ))
        .unwrap();
        DraftTransaction::from_extraction(
            extraction,
            chrono::Local::now().date_naive(),
            &registry,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_commit_appends_one_row_with_the_draft_fields() {
        let (service, handle) = service("ledger-commit");
        let before = chrono::Local::now().naive_local();

        let d = draft("45.50", "☕ Coffee/Drinks", "2025-01-15", "Starbucks");
        service.commit(&d).await.unwrap();

        let state = handle.get_state();
        let ws = state.worksheet("2025-01 January").expect("partition created");
        assert_eq!(ws.rows.len(), 2);
        assert_eq!(ws.rows[0], HEADER.map(String::from).to_vec());
        let row = &ws.rows[1];
        assert_eq!(
            &row[..8],
            &[
                "2025-01-15".to_string(),
                "".to_string(),
                "Starbucks".to_string(),
                "☕ Coffee/Drinks".to_string(),
                "45.50".to_string(),
                "MYR".to_string(),
                "".to_string(),
                "".to_string(),
            ]
        );
        let logged_at = NaiveDateTime::parse_from_str(&row[8], "%Y-%m-%d %H:%M:%S").unwrap();
        assert!(logged_at >= before - chrono::Duration::seconds(1));
    }

    #[tokio::test]
    async fn test_resolve_partition_is_idempotent() {
        let (service, handle) = service("ledger-resolve");
        let a = service
            .resolve_partition(chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
            .await
            .unwrap();
        let b = service
            .resolve_partition(chrono::NaiveDate::from_ymd_opt(2025, 6, 30).unwrap())
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(handle.get_state().titles(), vec!["2025-06 June"]);
    }

    #[tokio::test]
    async fn test_summary_of_two_commits() {
        let (service, _handle) = service("ledger-summary");
        service
            .commit(&draft("10.00", "🍔 Food & Dining", "2025-02-01", "A"))
            .await
            .unwrap();
        service
            .commit(&draft("20.00", "🍔 Food & Dining", "2025-02-14", "B"))
            .await
            .unwrap();

        let summary = service.monthly_summary("2025-02 February").await.unwrap();
        assert_eq!(summary.count(), 2);
        assert_eq!(summary.total(), Decimal::from_str("30.00").unwrap());
        assert_eq!(summary.average(), Decimal::from_str("15.00").unwrap());
        let top = summary.top_categories(5);
        assert_eq!(top, vec![("🍔 Food & Dining", Decimal::from_str("30.00").unwrap())]);
        assert_eq!(
            summary.percentage(top[0].1),
            Decimal::from_str("100").unwrap()
        );
    }

    #[tokio::test]
    async fn test_summary_of_missing_partition_is_empty() {
        let (service, _handle) = service("ledger-summary-missing");
        let summary = service.monthly_summary("2031-01 January").await.unwrap();
        assert!(summary.is_empty());
        assert_eq!(summary.count(), 0);
        assert_eq!(summary.total(), Decimal::ZERO);
        assert_eq!(summary.average(), Decimal::ZERO);
        assert!(summary.top_categories(5).is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_amounts_count_as_zero() {
        let rows = vec![
            HEADER.map(String::from).to_vec(),
            vec![
                "2025-01-01".into(),
                "".into(),
                "A".into(),
                "🏪 Groceries".into(),
                "not-a-number".into(),
                "MYR".into(),
                "".into(),
                "".into(),
                "ts".into(),
            ],
            vec![
                "2025-01-02".into(),
                "".into(),
                "B".into(),
                "🏪 Groceries".into(),
                "5.00".into(),
                "MYR".into(),
                "".into(),
                "".into(),
                "ts".into(),
            ],
        ];
        let summary = Summary::from_rows(&rows);
        assert_eq!(summary.count(), 2);
        assert_eq!(summary.total(), Decimal::from_str("5.00").unwrap());
    }

    #[tokio::test]
    async fn test_top_categories_ties_keep_row_order() {
        let mut rows = vec![HEADER.map(String::from).to_vec()];
        for (category, amount) in [("🐕 Pets", "5.00"), ("📚 Books", "7.00"), ("🍺 Social", "7.00")] {
            rows.push(vec![
                "2025-01-01".into(),
                "".into(),
                "x".into(),
                category.into(),
                amount.into(),
                "MYR".into(),
                "".into(),
                "".into(),
                "ts".into(),
            ]);
        }
        let summary = Summary::from_rows(&rows);
        let top: Vec<&str> = summary.top_categories(3).iter().map(|(c, _)| *c).collect();
        assert_eq!(top, vec!["📚 Books", "🍺 Social", "🐕 Pets"]);
    }

    #[tokio::test]
    async fn test_archive_renames_and_moves_to_end() {
        let (service, handle) = service("ledger-archive");
        service
            .resolve_partition(chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
            .await
            .unwrap();
        service
            .resolve_partition(chrono::NaiveDate::from_ymd_opt(2025, 2, 1).unwrap())
            .await
            .unwrap();

        let outcome = service.archive("2025-01 January").await.unwrap();
        assert_eq!(outcome, ArchiveOutcome::Archived);
        assert_eq!(
            handle.get_state().titles(),
            vec!["2025-02 February", "[ARCHIVED] 2025-01 January"]
        );
    }

    #[tokio::test]
    async fn test_archive_is_idempotent() {
        let (service, handle) = service("ledger-archive-idem");
        service
            .resolve_partition(chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
            .await
            .unwrap();

        assert_eq!(
            service.archive("2025-01 January").await.unwrap(),
            ArchiveOutcome::Archived
        );
        let state_after_first = handle.get_state();
        assert_eq!(
            service.archive("2025-01 January").await.unwrap(),
            ArchiveOutcome::AlreadyArchived
        );
        assert_eq!(handle.get_state(), state_after_first);
    }

    #[tokio::test]
    async fn test_archive_of_unknown_partition_is_an_error() {
        let (service, _handle) = service("ledger-archive-missing");
        let err = service.archive("2031-05 May").await.unwrap_err();
        assert!(err.to_string().contains("No worksheet found"));
    }

    #[tokio::test]
    async fn test_commit_into_archived_month_creates_a_fresh_partition() {
        let (service, handle) = service("ledger-archived-backdate");
        service
            .commit(&draft("10.00", "🏪 Groceries", "2025-01-05", "A"))
            .await
            .unwrap();
        service.archive("2025-01 January").await.unwrap();

        service
            .commit(&draft("3.00", "🏪 Groceries", "2025-01-20", "B"))
            .await
            .unwrap();

        let state = handle.get_state();
        let archived = state.worksheet("[ARCHIVED] 2025-01 January").unwrap();
        let fresh = state.worksheet("2025-01 January").unwrap();
        // The archived partition kept its single row; the late commit landed
        // in a new, active partition.
        assert_eq!(archived.rows.len(), 2);
        assert_eq!(fresh.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_commit_surfaces_backend_failure() {
        let (service, handle) = service("ledger-commit-fail");
        handle.set_state(TestSheetState {
            fail_message: Some("quota exceeded".to_string()),
            ..TestSheetState::default()
        });
        let err = service
            .commit(&draft("1.00", "🏪 Groceries", "2025-01-05", "A"))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_partitions_split_active_and_archived() {
        let (service, handle) = service("ledger-partitions");
        let mut state = TestSheetState::default();
        for title in [
            "Dashboard",
            "2025-01 January",
            "[ARCHIVED] 2024-12 December",
            "2025-02 February",
        ] {
            state.worksheets.push(TestWorksheetState {
                title: title.to_string(),
                ..Default::default()
            });
        }
        handle.set_state(state);

        let partitions = service.partitions().await.unwrap();
        assert_eq!(partitions.active, vec!["2025-01 January", "2025-02 February"]);
        assert_eq!(partitions.archived, vec!["2024-12 December"]);
    }
}
