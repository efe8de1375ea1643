//! Regulatory form composer
//!
//! Maps an `AnalyticsSummary` for a reporting period plus the manual
//! overrides into the four statutory forms. Composition is pure; the service
//! layer fetches the period's records and builds the summary first.

mod forms;

pub use forms::{
    BusinessSummaryForm, ChannelLine, ReinsuranceForm, ReserveLine, ReservesForm, SolvencyForm,
    SolvencyStatus, RESERVES_TOTAL_LABEL, SOLVENT_THRESHOLD_PCT, WARNING_THRESHOLD_PCT,
};

use crate::analytics::AnalyticsSummary;
use crate::config::SecondaryCurrency;
use crate::error::{AnalyticsError, Result};
use crate::export::ExportRow;
use crate::records::RecordFilter;
use crate::settings::Overrides;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive reporting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl ReportingPeriod {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if to < from {
            return Err(AnalyticsError::invalid(format!(
                "reporting period ends ({}) before it starts ({})",
                to, from
            )));
        }
        Ok(Self { from, to })
    }

    pub fn filter(&self) -> RecordFilter {
        RecordFilter::between(self.from, self.to)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulatoryForms {
    pub period: ReportingPeriod,
    pub base_currency: String,
    /// Code of the secondary rendering, when a flat rate was supplied
    pub secondary_currency: Option<String>,
    pub form1: BusinessSummaryForm,
    pub form2: SolvencyForm,
    pub form3: ReservesForm,
    pub form4: ReinsuranceForm,
}

/// Compose all four forms from a period summary
pub fn compose_regulatory_forms(
    period: ReportingPeriod,
    summary: &AnalyticsSummary,
    overrides: &Overrides,
    secondary: Option<&SecondaryCurrency>,
) -> RegulatoryForms {
    RegulatoryForms {
        period,
        base_currency: summary.base_currency.clone(),
        secondary_currency: secondary.map(|s| s.code.clone()),
        form1: BusinessSummaryForm::build(summary, secondary),
        form2: SolvencyForm::build(&overrides.solvency, secondary),
        form3: ReservesForm::build(summary, &overrides.ibnr_by_class, secondary),
        form4: ReinsuranceForm::build(summary, &overrides.reinsurance, secondary),
    }
}

impl RegulatoryForms {
    /// Every form as flat rows, each label prefixed with its form number
    pub fn export_rows(&self) -> Vec<ExportRow> {
        let sections = [
            ("Form 1", self.form1.export_rows()),
            ("Form 2", self.form2.export_rows()),
            ("Form 3", self.form3.export_rows()),
            ("Form 4", self.form4.export_rows()),
        ];
        sections
            .into_iter()
            .flat_map(|(form, rows)| {
                rows.into_iter().map(move |mut row| {
                    row.label = format!("{}: {}", form, row.label);
                    row
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::build_summary;
    use crate::analytics::channels::tests::{normalizer, record};
    use crate::records::{Channel, ClaimRecord};
    use crate::settings::{ReinsuranceInputs, SolvencyInputs};
    use approx::assert_abs_diff_eq;
    use std::collections::BTreeMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period() -> ReportingPeriod {
        ReportingPeriod::new(date(2024, 1, 1), date(2024, 12, 31)).unwrap()
    }

    fn overrides() -> Overrides {
        Overrides {
            operating_expenses: 100.0,
            ibnr_by_class: BTreeMap::from([("Property".to_string(), 40.0), ("Aviation".to_string(), 5.0)]),
            solvency: SolvencyInputs {
                total_assets: 1_000.0,
                total_liabilities: 700.0,
                min_capital_requirement: 200.0,
            },
            reinsurance: ReinsuranceInputs {
                proportional: 150.0,
                non_proportional: 50.0,
                facultative: 0.0,
                recoveries: 80.0,
                contract_count: 3,
                top_reinsurers: Vec::new(),
            },
        }
    }

    fn summary(overrides: &Overrides) -> AnalyticsSummary {
        let mut outward = record("o1", Channel::Outward, "UZS", 300.0, 0.0, 0.0);
        outward.counterparty = Some("Swiss Re".into());
        let records = vec![
            record("d1", Channel::Direct, "UZS", 1_000.0, 200.0, 50.0),
            record("i1", Channel::InwardDomestic, "UZS", 500.0, 100.0, 25.0),
            outward,
        ];
        let claims = vec![ClaimRecord {
            claim_id: "c1".into(),
            class_of_business: "Property".into(),
            currency: "UZS".into(),
            booked_on: date(2024, 6, 1),
            paid: 200.0,
            reserve: 60.0,
        }];
        build_summary(None, &records, &claims, overrides, &normalizer(), 10)
    }

    #[test]
    fn test_compose_forms() {
        let o = overrides();
        let forms = compose_regulatory_forms(period(), &summary(&o), &o, None);

        assert_eq!(forms.form1.gwp_by_channel.len(), 3);
        assert_eq!(forms.form1.gross_written_premium.base, 1_500.0);
        assert_eq!(forms.form1.ceded_premium.base, 300.0);
        assert_eq!(forms.form1.net_written_premium.base, 1_200.0);
        assert_eq!(forms.form1.ibnr.base, 45.0);

        assert_eq!(forms.form2.status, SolvencyStatus::Solvent);
        assert_eq!(forms.form2.solvency_ratio, 150.0);

        let property = forms.form3.lines.iter().find(|l| l.class_of_business == "Property").unwrap();
        assert_eq!(property.unearned_premium.base, 300.0);
        assert_eq!(property.outstanding_claims.base, 60.0);
        assert_eq!(property.total.base, 400.0);
        assert_eq!(forms.form3.total.total.base, 405.0);

        assert_eq!(forms.form4.total_ceded.base, 300.0);
        assert_eq!(forms.form4.unallocated.base, 100.0);
        assert_eq!(forms.form4.net_reinsurance_position.base, 220.0);
        assert_abs_diff_eq!(forms.form4.cession_ratio, 20.0, epsilon = 1e-9);
        assert_eq!(forms.form4.top_reinsurers, vec!["Swiss Re".to_string()]);
        assert!(forms.secondary_currency.is_none());
    }

    #[test]
    fn test_manual_reinsurer_list_wins() {
        let mut o = overrides();
        o.reinsurance.top_reinsurers = vec!["Munich Re".into(), "Hannover Re".into()];
        let forms = compose_regulatory_forms(period(), &summary(&o), &o, None);
        assert_eq!(forms.form4.top_reinsurers, vec!["Munich Re".to_string(), "Hannover Re".to_string()]);
    }

    #[test]
    fn test_secondary_rendering_uses_flat_rate() {
        let o = overrides();
        let usd = SecondaryCurrency::new("USD", 100.0).unwrap();
        let forms = compose_regulatory_forms(period(), &summary(&o), &o, Some(&usd));
        assert_eq!(forms.secondary_currency.as_deref(), Some("USD"));
        assert_eq!(forms.form1.gross_written_premium.secondary, Some(15.0));
        assert_eq!(forms.form4.total_ceded.secondary, Some(3.0));
    }

    #[test]
    fn test_export_rows_are_prefixed() {
        let o = overrides();
        let forms = compose_regulatory_forms(period(), &summary(&o), &o, None);
        let rows = forms.export_rows();
        assert!(rows.iter().all(|r| r.label.starts_with("Form ")));
        let ceded = rows.iter().find(|r| r.label == "Form 1: Premium ceded").unwrap();
        assert_eq!(ceded.amount_base, Some(-300.0));
        let ratio = rows.iter().find(|r| r.label == "Form 2: Solvency ratio").unwrap();
        assert_eq!(ratio.ratio_pct, Some(150.0));
    }

    #[test]
    fn test_reinsurance_counts_and_names_are_not_amounts() {
        let mut o = overrides();
        o.reinsurance.top_reinsurers = vec!["Munich Re".into()];
        let forms = compose_regulatory_forms(period(), &summary(&o), &o, None);
        let rows = forms.export_rows();

        let count = rows.iter().find(|r| r.label == "Form 4: Contract count").unwrap();
        assert_eq!(count.amount_base, None);
        assert_eq!(count.text.as_deref(), Some("3"));

        let reinsurer = rows.iter().find(|r| r.label == "Form 4: Reinsurer #1").unwrap();
        assert_eq!(reinsurer.amount_base, None);
        assert_eq!(reinsurer.text.as_deref(), Some("Munich Re"));

        let money: Vec<_> = rows.iter().filter(|r| r.amount_base.is_some()).collect();
        assert!(money.iter().all(|r| r.text.is_none() && r.ratio_pct.is_none()));
    }

    #[test]
    fn test_inverted_period_is_rejected() {
        assert!(ReportingPeriod::new(date(2024, 12, 31), date(2024, 1, 1)).is_err());
    }
}
