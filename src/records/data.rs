//! Booked records consumed by the analytics engine
//!
//! Records are immutable once booked and sourced from the external data store.
//! Monetary amounts are kept as positive magnitudes after normalization; the
//! sign of a deduction line is applied only when a statement is rendered.

use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Business channel of a monetary record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    /// Direct insurance written by the company
    Direct,
    /// Inward reinsurance from domestic cedants
    InwardDomestic,
    /// Inward reinsurance from foreign cedants
    InwardForeign,
    /// Outward (ceded) reinsurance
    Outward,
}

impl Channel {
    /// Every channel in reporting order
    pub const ALL: [Channel; 4] = [
        Channel::Direct,
        Channel::InwardDomestic,
        Channel::InwardForeign,
        Channel::Outward,
    ];

    pub fn is_gross(&self) -> bool {
        !matches!(self, Channel::Outward)
    }

    /// Label used on statements and exports
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Direct => "Direct insurance",
            Channel::InwardDomestic => "Inward reinsurance (domestic)",
            Channel::InwardForeign => "Inward reinsurance (foreign)",
            Channel::Outward => "Outward reinsurance (ceded)",
        }
    }

    /// Classify a raw source row.
    ///
    /// Inward business is domestic when its territory matches a configured
    /// domestic token or it is booked in the base currency.
    pub fn classify(
        record_type: &str,
        territory: Option<&str>,
        currency: &str,
        config: &AnalyticsConfig,
    ) -> Result<Self> {
        match record_type.trim().to_uppercase().as_str() {
            "DIRECT" => Ok(Channel::Direct),
            "OUTWARD" => Ok(Channel::Outward),
            "INWARD" => {
                let domestic_territory = territory
                    .map(|t| config.is_domestic_territory(t))
                    .unwrap_or(false);
                let domestic_currency = currency.trim().eq_ignore_ascii_case(&config.base_currency);
                if domestic_territory || domestic_currency {
                    Ok(Channel::InwardDomestic)
                } else {
                    Ok(Channel::InwardForeign)
                }
            }
            other => Err(AnalyticsError::invalid(format!("Unknown record type: {}", other))),
        }
    }
}

/// Reinsurance structure of a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Structure {
    #[default]
    Proportional,
    NonProportional,
}

impl Structure {
    /// "XL", "excess" or "non..." mark non-proportional cover; blank defaults to proportional
    pub fn from_text(text: Option<&str>) -> Self {
        let upper = text.map(|s| s.trim().to_uppercase()).unwrap_or_default();
        if upper.contains("XL") || upper.contains("EXCESS") || upper.contains("NON") {
            Structure::NonProportional
        } else {
            Structure::Proportional
        }
    }
}

/// A booked premium transaction in its original currency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonetaryRecord {
    pub record_id: String,
    pub channel: Channel,
    pub currency: String,

    /// Booking date, used for period filtering and the FX lookup
    pub booked_on: NaiveDate,

    pub class_of_business: String,

    /// Cedant for inward business, reinsurer for outward business
    #[serde(default)]
    pub counterparty: Option<String>,

    #[serde(default)]
    pub structure: Structure,

    pub gross_premium: f64,
    pub unearned_premium_delta: f64,

    /// Premium ceded as recorded on the record itself (informational;
    /// the outward channel is authoritative for ceded premium)
    pub ceded_premium: f64,

    pub commission: f64,

    /// Our share of the risk, 0 to 1
    pub our_share: f64,
}

/// A claim booked against a class of business
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub claim_id: String,
    pub class_of_business: String,
    pub currency: String,
    pub booked_on: NaiveDate,
    pub paid: f64,
    pub reserve: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BordereauxType {
    Premium,
    Claims,
    Adjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BordereauxStatus {
    Pending,
    UnderReview,
    Accepted,
    Disputed,
    Rejected,
}

/// A periodic statement submitted by a coverholder under a binding agreement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BordereauxEntry {
    pub entry_id: String,
    pub agreement_id: String,
    #[serde(rename = "type")]
    pub kind: BordereauxType,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub status: BordereauxStatus,
    pub total_gwp: f64,
    pub total_policies: u64,
    pub total_claims_paid: f64,
    pub total_claims_reserved: f64,
}

impl BordereauxEntry {
    /// Only accepted entries count toward an agreement's actual GWP
    pub fn is_recognized(&self) -> bool {
        self.status == BordereauxStatus::Accepted
    }
}

/// A stored exchange rate quote: `nominal` units of `currency` = `rate` base units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub currency: String,
    pub date: NaiveDate,
    pub rate: f64,
    #[serde(default = "default_nominal")]
    pub nominal: f64,
}

fn default_nominal() -> f64 {
    1.0
}

impl ExchangeRate {
    /// Rate for a single unit of the quoted currency
    pub fn per_unit(&self) -> f64 {
        if self.nominal > 0.0 {
            self.rate / self.nominal
        } else {
            self.rate
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgreementStatus {
    Draft,
    Active,
    Expired,
    Cancelled,
}

/// A binding authority agreement with an MGA / coverholder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingAgreement {
    pub agreement_id: String,
    pub name: String,
    /// Estimated premium income for the agreement term
    pub epi: f64,
    pub our_share: f64,
    pub currency: String,
    pub status: AgreementStatus,
    pub inception_date: NaiveDate,
}

/// Inclusive date range used to select records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl RecordFilter {
    /// Everything booked on or before `as_of`
    pub fn up_to(as_of: Option<NaiveDate>) -> Self {
        Self { from: None, to: as_of }
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from: Some(from), to: Some(to) }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_channel_classification() {
        let config = AnalyticsConfig::default();

        assert_eq!(Channel::classify("DIRECT", None, "UZS", &config).unwrap(), Channel::Direct);
        assert_eq!(Channel::classify("outward", None, "USD", &config).unwrap(), Channel::Outward);
        assert_eq!(
            Channel::classify("INWARD", Some("Uzbekistan"), "USD", &config).unwrap(),
            Channel::InwardDomestic
        );
        assert_eq!(
            Channel::classify("INWARD", Some("Turkey"), "uzs", &config).unwrap(),
            Channel::InwardDomestic
        );
        assert_eq!(
            Channel::classify("INWARD", Some("Turkey"), "EUR", &config).unwrap(),
            Channel::InwardForeign
        );
        assert!(Channel::classify("SLIP", None, "UZS", &config).is_err());
    }

    #[test]
    fn test_structure_from_text() {
        assert_eq!(Structure::from_text(None), Structure::Proportional);
        assert_eq!(Structure::from_text(Some("%")), Structure::Proportional);
        assert_eq!(Structure::from_text(Some("XL layer 2")), Structure::NonProportional);
        assert_eq!(Structure::from_text(Some("Excess of loss")), Structure::NonProportional);
        assert_eq!(Structure::from_text(Some("non-prop")), Structure::NonProportional);
    }

    #[test]
    fn test_exchange_rate_nominal() {
        let jpy = ExchangeRate { currency: "JPY".into(), date: date(2024, 3, 1), rate: 76.31, nominal: 10.0 };
        assert!((jpy.per_unit() - 7.631).abs() < 1e-12);
    }

    #[test]
    fn test_record_filter_bounds_inclusive() {
        let filter = RecordFilter::between(date(2024, 1, 1), date(2024, 3, 31));
        assert!(filter.contains(date(2024, 1, 1)));
        assert!(filter.contains(date(2024, 3, 31)));
        assert!(!filter.contains(date(2024, 4, 1)));
        assert!(RecordFilter::up_to(None).contains(date(1999, 1, 1)));
    }
}
