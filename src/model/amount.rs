//! Amount type for monetary values extracted from receipts.
//!
//! This module provides the `Amount` type which wraps `Decimal` and handles
//! parsing values that may carry currency symbols, thousands separators or
//! surrounding whitespace, e.g. `RM 1,234.50` or `$45.50`.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A monetary amount.
///
/// The wrapped `Decimal` retains full precision as received; rounding to two
/// fraction digits happens only when an amount is displayed to the user via
/// [`Amount::display_2dp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub(crate) struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Creates a new Amount from a Decimal value.
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Returns the absolute value. Receipt screenshots show magnitudes; a
    /// leading minus in the extraction carries no meaning here.
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Parses a cell value, treating anything unparseable as zero. Used when
    /// aggregating rows that may contain blanks or junk.
    pub fn parse_lenient(s: &str) -> Self {
        Self::from_str(s).unwrap_or_default()
    }

    /// The amount rounded to two fraction digits for display.
    pub fn display_2dp(&self) -> String {
        format!("{:.2}", self.0)
    }
}

impl FromStr for Amount {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        // An absent amount is zero, matching how missing cells aggregate.
        if trimmed.is_empty() {
            return Ok(Amount::ZERO);
        }

        // Drop currency symbols, letters, commas and whitespace, keeping only
        // the numeric skeleton.
        let cleaned: String = trimmed
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        if cleaned.is_empty() {
            anyhow::bail!("'{trimmed}' contains no numeric value");
        }

        let value = Decimal::from_str(&cleaned)
            .map_err(|e| anyhow::anyhow!("'{trimmed}' is not a valid amount: {e}"))?;
        Ok(Amount(value))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}
