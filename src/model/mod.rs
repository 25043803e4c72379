//! Types that represent the core data model, such as `DraftTransaction` and
//! `LedgerRow`.
mod amount;
mod category;
mod draft;
mod row;

pub(crate) use amount::Amount;
pub(crate) use category::CategoryRegistry;
pub(crate) use draft::{DraftTransaction, Extraction};
pub(crate) use row::{LedgerRow, AMOUNT_COL, CATEGORY_COL, HEADER};
