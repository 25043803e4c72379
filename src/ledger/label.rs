//! Partition labels.
//!
//! Each calendar month maps to exactly one worksheet whose title is derived
//! deterministically from the date, e.g. `2025-01 January`. Archiving a
//! partition renames it with the `[ARCHIVED] ` prefix, which also removes it
//! from "current month" resolution.

use chrono::NaiveDate;

pub(crate) const ARCHIVED_PREFIX: &str = "[ARCHIVED] ";

/// The partition label for the month containing `date`.
pub(crate) fn for_date(date: NaiveDate) -> String {
    date.format("%Y-%m %B").to_string()
}

/// The archived form of a partition label.
pub(crate) fn archived(label: &str) -> String {
    format!("{ARCHIVED_PREFIX}{label}")
}

/// The plain label of an archived worksheet title, or `None` when the title
/// carries no archive marker.
pub(crate) fn strip_archived(title: &str) -> Option<&str> {
    title.strip_prefix(ARCHIVED_PREFIX)
}

/// Whether a worksheet title looks like a month partition (`YYYY-MM ...`).
/// Spreadsheets commonly carry unrelated tabs (dashboards, templates) that
/// must not be listed as ledger months.
pub(crate) fn is_month_label(title: &str) -> bool {
    let bytes = title.as_bytes();
    bytes.len() > 8
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b' '
}
