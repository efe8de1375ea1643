//! Flat rows handed to the external spreadsheet writer
//!
//! Aggregates are stored as positive magnitudes. Deduction lines get their
//! sign here, at presentation time, and nowhere else.

use crate::config::SecondaryCurrency;
use serde::{Deserialize, Serialize};

/// A base-currency figure with its optional secondary-currency rendering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub base: f64,
    pub secondary: Option<f64>,
}

impl Money {
    pub fn new(base: f64, secondary: Option<&SecondaryCurrency>) -> Self {
        Self {
            base,
            secondary: secondary.map(|s| s.convert(base)),
        }
    }
}

/// One exported line: an amount, a ratio, or a label with a text value.
///
/// Only amount lines carry `amount_base`, so money columns never hold
/// counts or names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_base: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_secondary: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ExportRow {
    /// Amount line, shown as-is
    pub fn amount(label: impl Into<String>, money: Money) -> Self {
        Self {
            label: label.into(),
            amount_base: Some(money.base),
            amount_secondary: money.secondary,
            ratio_pct: None,
            text: None,
        }
    }

    /// Deduction line, shown negated
    pub fn deduction(label: impl Into<String>, money: Money) -> Self {
        Self {
            label: label.into(),
            amount_base: Some(-money.base),
            amount_secondary: money.secondary.map(|s| -s),
            ratio_pct: None,
            text: None,
        }
    }

    pub fn ratio(label: impl Into<String>, pct: f64) -> Self {
        Self {
            label: label.into(),
            amount_base: None,
            amount_secondary: None,
            ratio_pct: Some(pct),
            text: None,
        }
    }

    /// Non-monetary line such as a count or a counterparty name
    pub fn note(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            amount_base: None,
            amount_secondary: None,
            ratio_pct: None,
            text: Some(text.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deduction_negates_both_currencies() {
        let usd = SecondaryCurrency::new("USD", 10.0).unwrap();
        let row = ExportRow::deduction("Ceded premium", Money::new(500.0, Some(&usd)));
        assert_eq!(row.amount_base, Some(-500.0));
        assert_eq!(row.amount_secondary, Some(-50.0));
        assert_eq!(row.ratio_pct, None);
    }

    #[test]
    fn test_money_without_secondary() {
        let money = Money::new(500.0, None);
        assert_eq!(money.secondary, None);
        let json = serde_json::to_value(ExportRow::amount("GWP", money)).unwrap();
        assert!(json.get("amount_secondary").is_none());
    }

    #[test]
    fn test_note_carries_no_amount() {
        let row = ExportRow::note("Contract count", "3");
        assert_eq!(row.amount_base, None);
        assert_eq!(row.ratio_pct, None);
        assert_eq!(row.text.as_deref(), Some("3"));
        assert!(ExportRow::ratio("Loss ratio", 60.0).amount_base.is_none());
    }
}
