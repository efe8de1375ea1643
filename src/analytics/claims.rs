//! Claims aggregation by class of business

use crate::currency::CurrencyNormalizer;
use crate::records::ClaimRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassClaims {
    pub claim_count: usize,
    pub paid: f64,
    pub reserve: f64,
    /// Manual IBNR override for the class
    pub ibnr: f64,
    pub incurred: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimsTotals {
    pub by_class: BTreeMap<String, ClassClaims>,
    pub paid: f64,
    /// Outstanding reserve booked in the period
    pub reserve_change: f64,
    pub ibnr_total: f64,
    pub incurred: f64,
    pub unconverted_records: usize,
    pub unconverted_currencies: BTreeSet<String>,
}

/// Fold claims per class and attach the IBNR overrides.
///
/// Classes that appear only in the IBNR map still get a row.
pub fn aggregate_claims(
    claims: &[ClaimRecord],
    fx: &CurrencyNormalizer,
    ibnr_by_class: &BTreeMap<String, f64>,
) -> ClaimsTotals {
    let mut totals = ClaimsTotals::default();

    for claim in claims {
        let paid = fx.to_base(claim.paid, &claim.currency, claim.booked_on);
        let reserve = fx.to_base(claim.reserve, &claim.currency, claim.booked_on);
        if paid.is_unconverted() || reserve.is_unconverted() {
            totals.unconverted_records += 1;
            totals.unconverted_currencies.insert(claim.currency.clone());
        }

        let class = totals.by_class.entry(claim.class_of_business.clone()).or_default();
        class.claim_count += 1;
        class.paid += paid.amount.abs();
        class.reserve += reserve.amount.abs();
    }

    for (class_name, ibnr) in ibnr_by_class {
        totals.by_class.entry(class_name.clone()).or_default().ibnr = *ibnr;
    }

    for class in totals.by_class.values_mut() {
        class.incurred = class.paid + class.reserve + class.ibnr;
        totals.paid += class.paid;
        totals.reserve_change += class.reserve;
    }
    totals.ibnr_total = ibnr_by_class.values().sum();
    totals.incurred = totals.paid + totals.reserve_change + totals.ibnr_total;

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::channels::tests::normalizer;
    use chrono::NaiveDate;

    fn claim(id: &str, class: &str, currency: &str, paid: f64, reserve: f64) -> ClaimRecord {
        ClaimRecord {
            claim_id: id.into(),
            class_of_business: class.into(),
            currency: currency.into(),
            booked_on: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            paid,
            reserve,
        }
    }

    #[test]
    fn test_claims_by_class_with_ibnr() {
        let claims = vec![
            claim("c1", "Property", "UZS", 100.0, 40.0),
            claim("c2", "Property", "UZS", 60.0, 0.0),
            claim("c3", "Cargo", "USD", 0.01, 0.0),
        ];
        let ibnr = BTreeMap::from([("Property".to_string(), 25.0), ("Aviation".to_string(), 10.0)]);

        let totals = aggregate_claims(&claims, &normalizer(), &ibnr);

        let property = &totals.by_class["Property"];
        assert_eq!(property.claim_count, 2);
        assert_eq!(property.paid, 160.0);
        assert_eq!(property.incurred, 225.0);

        assert!((totals.by_class["Cargo"].paid - 125.0).abs() < 1e-9);
        assert_eq!(totals.by_class["Aviation"].incurred, 10.0);
        assert_eq!(totals.by_class["Aviation"].claim_count, 0);

        assert_eq!(totals.ibnr_total, 35.0);
        assert!((totals.incurred - (285.0 + 40.0 + 35.0)).abs() < 1e-9);
        assert_eq!(totals.unconverted_records, 0);
    }
}
