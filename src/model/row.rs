//! The committed, persisted form of a transaction.

use crate::model::{Amount, DraftTransaction};
use chrono::{NaiveDateTime, NaiveTime};

/// The fixed header row written when a monthly worksheet is created.
pub(crate) const HEADER: [&str; 9] = [
    "Date",
    "Time",
    "Merchant",
    "Category",
    "Amount",
    "Currency",
    "Payment Method",
    "Description",
    "Logged At",
];

/// Zero-based column positions within a ledger worksheet.
pub(crate) const CATEGORY_COL: usize = 3;
pub(crate) const AMOUNT_COL: usize = 4;

/// A committed ledger row. Append-only: rows are never mutated or deleted once
/// written.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LedgerRow {
    pub date: chrono::NaiveDate,
    pub time: Option<NaiveTime>,
    pub merchant: String,
    pub category: String,
    pub amount: Amount,
    pub currency: String,
    pub payment_method: String,
    pub description: String,
    /// Wall-clock time of commit, not of the original transaction.
    pub logged_at: NaiveDateTime,
}

impl LedgerRow {
    /// Builds the row persisted for a confirmed draft. `logged_at` is the
    /// commit timestamp.
    pub fn from_draft(draft: &DraftTransaction, logged_at: NaiveDateTime) -> Self {
        Self {
            date: draft.date(),
            time: draft.time(),
            merchant: draft.merchant().to_string(),
            category: draft.category().to_string(),
            amount: draft.amount(),
            currency: draft.currency().to_string(),
            payment_method: draft.payment_method().to_string(),
            description: draft.description().to_string(),
            logged_at,
        }
    }

    /// The nine ordered cells appended to the worksheet.
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.date.format("%Y-%m-%d").to_string(),
            self.time
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_default(),
            self.merchant.clone(),
            self.category.clone(),
            self.amount.to_string(),
            self.currency.clone(),
            self.payment_method.clone(),
            self.description.clone(),
            self.logged_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]
    }
}
