//! The draft transaction staged for user confirmation.

use crate::model::{Amount, CategoryRegistry};
use crate::Result;
use anyhow::bail;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The raw JSON object returned by the recognition service. Every field is
/// optional here; defaults are applied once, in
/// [`DraftTransaction::from_extraction`], and nowhere else.
#[derive(Debug, Default, Clone, Deserialize)]
pub(crate) struct Extraction {
    /// The recognition service may return the amount as a JSON number or as a
    /// string, depending on what it read off the screenshot.
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Present when the service could not read the screenshot.
    #[serde(default)]
    pub error: Option<String>,
}

/// An unconfirmed transaction pending user review.
///
/// Constructed fully populated, with all defaults already applied. The only
/// mutation allowed before commit is category reassignment via
/// [`DraftTransaction::set_category`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct DraftTransaction {
    amount: Amount,
    currency: String,
    merchant: String,
    date: NaiveDate,
    time: Option<NaiveTime>,
    payment_method: String,
    category: &'static str,
    description: String,
}

impl DraftTransaction {
    /// Builds a fully-populated draft from a raw extraction, applying all
    /// defaults: amount zero when absent, currency `MYR`, date `today` when
    /// absent or unparseable, category resolved against the registry.
    pub fn from_extraction(
        extraction: Extraction,
        today: NaiveDate,
        registry: &CategoryRegistry,
    ) -> Result<Self> {
        let amount = parse_amount(extraction.amount.as_ref())?;
        let date = extraction
            .date
            .as_deref()
            .and_then(parse_date)
            .unwrap_or(today);
        let time = extraction.time.as_deref().and_then(parse_time);
        Ok(Self {
            amount,
            currency: normalize_currency(extraction.currency.as_deref()),
            merchant: extraction.merchant.unwrap_or_default().trim().to_string(),
            date,
            time,
            payment_method: extraction
                .payment_method
                .unwrap_or_default()
                .trim()
                .to_string(),
            category: registry.resolve(extraction.category.as_deref()),
            description: extraction
                .description
                .unwrap_or_default()
                .trim()
                .to_string(),
        })
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn merchant(&self) -> &str {
        &self.merchant
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn time(&self) -> Option<NaiveTime> {
        self.time
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    pub fn category(&self) -> &'static str {
        self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Reassigns the category. The `&'static str` must come from the registry,
    /// which is the only producer of these values.
    pub fn set_category(&mut self, category: &'static str) {
        self.category = category;
    }

    #[cfg(test)]
    pub fn sample(registry: &CategoryRegistry) -> Self {
        Self {
            amount: Amount::from_str("45.50").unwrap(),
            currency: "MYR".to_string(),
            merchant: "Starbucks".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            time: None,
            payment_method: String::new(),
            category: registry.resolve(Some("☕ Coffee/Drinks")),
            description: String::new(),
        }
    }
}

/// The amount may arrive as a JSON number or string; an absent amount is zero.
/// Sign is dropped, screenshots carry magnitudes only.
fn parse_amount(value: Option<&serde_json::Value>) -> Result<Amount> {
    let amount = match value {
        None | Some(serde_json::Value::Null) => Amount::ZERO,
        Some(serde_json::Value::String(s)) => Amount::from_str(s)?,
        Some(serde_json::Value::Number(n)) => Amount::from_str(&n.to_string())?,
        Some(other) => bail!("unexpected amount value in extraction: {other}"),
    };
    Ok(amount.abs())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

fn normalize_currency(code: Option<&str>) -> String {
    match code.map(str::trim) {
        Some(code) if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) => {
            code.to_ascii_uppercase()
        }
        _ => "MYR".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn extraction_json(json: &str) -> Extraction {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_fully_populated_extraction() {
        let registry = CategoryRegistry::standard();
        let ext = extraction_json(
            r#"{
                "amount": "45.50",
                "currency": "MYR",
                "merchant": "Starbucks",
                "date": "2025-01-15",
                "time": "08:30",
                "payment_method": "Apple Pay",
                "category": "☕ Coffee/Drinks",
                "description": "latte"
            }"#,
        );
        let draft = DraftTransaction::from_extraction(ext, today(), &registry).unwrap();
        assert_eq!(draft.amount().to_string(), "45.50");
        assert_eq!(draft.currency(), "MYR");
        assert_eq!(draft.merchant(), "Starbucks");
        assert_eq!(draft.date(), NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(draft.time(), NaiveTime::from_hms_opt(8, 30, 0));
        assert_eq!(draft.payment_method(), "Apple Pay");
        assert_eq!(draft.category(), "☕ Coffee/Drinks");
        assert_eq!(draft.description(), "latte");
    }

    #[test]
    fn test_defaults_applied_once_at_the_boundary() {
        let registry = CategoryRegistry::standard();
        let draft =
            DraftTransaction::from_extraction(Extraction::default(), today(), &registry).unwrap();
        assert!(draft.amount().value().is_zero());
        assert_eq!(draft.currency(), "MYR");
        assert_eq!(draft.merchant(), "");
        assert_eq!(draft.date(), today());
        assert_eq!(draft.time(), None);
        assert_eq!(draft.category(), "💳 Others");
    }

    #[test]
    fn test_numeric_amount_accepted() {
        let registry = CategoryRegistry::standard();
        let ext = extraction_json(r#"{"amount": 45.5}"#);
        let draft = DraftTransaction::from_extraction(ext, today(), &registry).unwrap();
        assert_eq!(draft.amount().display_2dp(), "45.50");
    }

    #[test]
    fn test_negative_amount_becomes_magnitude() {
        let registry = CategoryRegistry::standard();
        let ext = extraction_json(r#"{"amount": "-12.00"}"#);
        let draft = DraftTransaction::from_extraction(ext, today(), &registry).unwrap();
        assert_eq!(draft.amount().display_2dp(), "12.00");
    }

    #[test]
    fn test_unparseable_amount_is_an_error() {
        let registry = CategoryRegistry::standard();
        let ext = extraction_json(r#"{"amount": "a lot"}"#);
        assert!(DraftTransaction::from_extraction(ext, today(), &registry).is_err());
    }

    #[test]
    fn test_unparseable_date_defaults_to_today() {
        let registry = CategoryRegistry::standard();
        let ext = extraction_json(r#"{"date": "15/01/2025"}"#);
        let draft = DraftTransaction::from_extraction(ext, today(), &registry).unwrap();
        assert_eq!(draft.date(), today());
    }

    #[test]
    fn test_unknown_category_falls_back() {
        let registry = CategoryRegistry::standard();
        let ext = extraction_json(r#"{"category": "Yacht upkeep"}"#);
        let draft = DraftTransaction::from_extraction(ext, today(), &registry).unwrap();
        assert_eq!(draft.category(), registry.fallback());
    }

    #[test]
    fn test_invalid_currency_defaults() {
        let registry = CategoryRegistry::standard();
        for bad in ["", "ringgit", "M1R", "myr$"] {
            let ext = Extraction {
                currency: Some(bad.to_string()),
                ..Extraction::default()
            };
            let draft = DraftTransaction::from_extraction(ext, today(), &registry).unwrap();
            assert_eq!(draft.currency(), "MYR", "for input {bad:?}");
        }
        let ext = Extraction {
            currency: Some("usd".to_string()),
            ..Extraction::default()
        };
        let draft = DraftTransaction::from_extraction(ext, today(), &registry).unwrap();
        assert_eq!(draft.currency(), "USD");
    }

    #[test]
    fn test_error_key_is_carried_through() {
        let ext = extraction_json(r#"{"error": "image too blurry"}"#);
        assert_eq!(ext.error.as_deref(), Some("image too blurry"));
    }
}
