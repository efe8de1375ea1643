//! Analytics summary: a pure function of records, overrides and rates

use super::channels::{aggregate_channels, percent, ChannelSubtotal, CounterpartyPremium, PremiumTotals};
use super::claims::{aggregate_claims, ClaimsTotals};
use super::ratios::{compute_technical_account, TechnicalAccount};
use crate::currency::CurrencyNormalizer;
use crate::records::{ClaimRecord, MonetaryRecord};
use crate::settings::Overrides;
use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Derived view, recomputed on every request and never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub as_of: Option<NaiveDate>,
    pub base_currency: String,
    pub total: PremiumTotals,
    pub channels: Vec<ChannelSubtotal>,
    pub claims: ClaimsTotals,
    pub operating_expenses: f64,
    pub expense_ratio: f64,
    pub loss_ratio_by_class: BTreeMap<String, f64>,
    pub technical_account: TechnicalAccount,
    /// Upr per class on the gross channels, used by the reserves form
    pub unearned_premium_by_class: BTreeMap<String, f64>,
    pub top_cedants: Vec<CounterpartyPremium>,
    pub top_reinsurers: Vec<CounterpartyPremium>,
    /// Currencies that had no usable rate and were left unconverted
    pub unconverted_currencies: Vec<String>,
}

impl AnalyticsSummary {
    pub fn has_unconverted_amounts(&self) -> bool {
        !self.unconverted_currencies.is_empty()
    }
}

/// Build the summary from already-fetched inputs
pub fn build_summary(
    as_of: Option<NaiveDate>,
    records: &[MonetaryRecord],
    claims: &[ClaimRecord],
    overrides: &Overrides,
    fx: &CurrencyNormalizer,
    top_n: usize,
) -> AnalyticsSummary {
    let channel_totals = aggregate_channels(records, fx, top_n);
    let claims_totals = aggregate_claims(claims, fx, &overrides.ibnr_by_class);
    let technical_account =
        compute_technical_account(&channel_totals.total, &claims_totals, overrides.operating_expenses);

    let mut classes: BTreeSet<&String> = channel_totals.premium_by_class.keys().collect();
    classes.extend(claims_totals.by_class.keys());

    let loss_ratio_by_class: BTreeMap<String, f64> = classes
        .into_iter()
        .map(|class| {
            let earned = channel_totals
                .premium_by_class
                .get(class)
                .map(|p| p.gross_premium_earned)
                .unwrap_or(0.0);
            let incurred = claims_totals.by_class.get(class).map(|c| c.incurred).unwrap_or(0.0);
            (class.clone(), percent(incurred, earned))
        })
        .collect();

    let unearned_premium_by_class = channel_totals
        .premium_by_class
        .iter()
        .map(|(class, p)| (class.clone(), p.unearned_premium_reserve))
        .collect();

    let unconverted: BTreeSet<String> = channel_totals
        .unconverted_currencies
        .iter()
        .chain(claims_totals.unconverted_currencies.iter())
        .cloned()
        .collect();
    if !unconverted.is_empty() {
        warn!(
            "{} premium and {} claim records left unconverted ({:?})",
            channel_totals.unconverted_records, claims_totals.unconverted_records, unconverted
        );
    }

    AnalyticsSummary {
        as_of,
        base_currency: fx.base().to_string(),
        expense_ratio: technical_account.ratios.expense_ratio,
        operating_expenses: overrides.operating_expenses,
        total: channel_totals.total,
        channels: channel_totals.channels,
        claims: claims_totals,
        loss_ratio_by_class,
        technical_account,
        unearned_premium_by_class,
        top_cedants: channel_totals.top_cedants,
        top_reinsurers: channel_totals.top_reinsurers,
        unconverted_currencies: unconverted.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::channels::tests::{normalizer, record};
    use crate::records::Channel;
    use approx::assert_abs_diff_eq;

    fn claim(class: &str, paid: f64, reserve: f64) -> ClaimRecord {
        ClaimRecord {
            claim_id: format!("c-{}", class),
            class_of_business: class.into(),
            currency: "UZS".into(),
            booked_on: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            paid,
            reserve,
        }
    }

    fn overrides() -> Overrides {
        Overrides {
            operating_expenses: 300.0,
            ibnr_by_class: BTreeMap::from([("Property".to_string(), 50.0)]),
            ..Default::default()
        }
    }

    #[test]
    fn test_summary_is_deterministic() {
        let records = vec![
            record("d1", Channel::Direct, "UZS", 1_000.1, 200.2, 100.3),
            record("f1", Channel::InwardForeign, "USD", 0.37, 0.05, 0.01),
            record("f2", Channel::InwardForeign, "EUR", 10.0, 0.0, 0.0),
            record("o1", Channel::Outward, "UZS", 300.7, 30.0, 15.0),
        ];
        let claims = vec![claim("Property", 400.0, 100.0), claim("Motor", 10.0, 0.0)];

        let first = build_summary(None, &records, &claims, &overrides(), &normalizer(), 5);
        let second = build_summary(None, &records, &claims, &overrides(), &normalizer(), 5);
        assert_eq!(first, second);
        assert_eq!(first.unconverted_currencies, vec!["EUR".to_string()]);
        assert!(first.has_unconverted_amounts());
    }

    #[test]
    fn test_summary_ratios() {
        let records = vec![
            record("d1", Channel::Direct, "UZS", 2_000.0, 500.0, 200.0),
            record("o1", Channel::Outward, "UZS", 500.0, 0.0, 0.0),
        ];
        let claims = vec![claim("Property", 600.0, 100.0), claim("Motor", 10.0, 0.0)];

        let summary = build_summary(None, &records, &claims, &overrides(), &normalizer(), 5);
        let r = summary.technical_account.ratios;

        // Incurred 600 + 100 + 10 + IBNR 50 = 760 on GPE 1,500
        assert_abs_diff_eq!(r.loss_ratio, 760.0 / 1_500.0 * 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(summary.expense_ratio, 300.0 / 1_000.0 * 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.combined_ratio, r.loss_ratio + r.commission_ratio + r.expense_ratio, epsilon = 1e-9);

        // Property: 750 incurred on 1,500 earned; Motor has no premium
        assert_abs_diff_eq!(summary.loss_ratio_by_class["Property"], 50.0, epsilon = 1e-9);
        assert_eq!(summary.loss_ratio_by_class["Motor"], 0.0);
        assert_eq!(summary.unearned_premium_by_class["Property"], 500.0);
        assert!(!summary.has_unconverted_amounts());
    }

    #[test]
    fn test_empty_inputs_do_not_produce_nan() {
        let summary = build_summary(None, &[], &[], &Overrides::default(), &normalizer(), 5);
        let r = summary.technical_account.ratios;
        assert_eq!(r.loss_ratio, 0.0);
        assert_eq!(r.combined_ratio, 0.0);
        assert_eq!(summary.channels.len(), 4);
    }
}
