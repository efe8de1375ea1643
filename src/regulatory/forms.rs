//! The four statutory forms
//!
//! Each form holds `Money` figures, so the base amount and its flat-rate
//! secondary rendering always travel together.

use crate::analytics::{percent, AnalyticsSummary, KeyRatios};
use crate::config::SecondaryCurrency;
use crate::export::{ExportRow, Money};
use crate::records::Channel;
use crate::settings::{ReinsuranceInputs, SolvencyInputs};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Solvency ratio at or above which the insurer is solvent
pub const SOLVENT_THRESHOLD_PCT: f64 = 120.0;
/// Solvency ratio below which capital is insufficient
pub const WARNING_THRESHOLD_PCT: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelLine {
    pub channel: Channel,
    pub gross_written_premium: Money,
}

/// Form 1: business summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessSummaryForm {
    pub gwp_by_channel: Vec<ChannelLine>,
    pub gross_written_premium: Money,
    pub ceded_premium: Money,
    pub net_written_premium: Money,
    pub change_in_unearned_premium: Money,
    pub net_premium_earned: Money,
    pub commission: Money,
    pub claims_paid: Money,
    pub claims_reserved: Money,
    pub ibnr: Money,
    pub claims_incurred: Money,
    pub operating_expenses: Money,
    pub underwriting_result: Money,
    pub ratios: KeyRatios,
}

impl BusinessSummaryForm {
    pub fn build(summary: &AnalyticsSummary, secondary: Option<&SecondaryCurrency>) -> Self {
        let m = |amount: f64| Money::new(amount, secondary);
        let ta = &summary.technical_account;

        let gwp_by_channel = summary
            .channels
            .iter()
            .filter(|c| c.channel.is_gross())
            .map(|c| ChannelLine {
                channel: c.channel,
                gross_written_premium: m(c.gross_written_premium),
            })
            .collect();

        Self {
            gwp_by_channel,
            gross_written_premium: m(ta.gross_written_premium),
            ceded_premium: m(ta.ceded_premium),
            net_written_premium: m(ta.net_written_premium),
            change_in_unearned_premium: m(ta.unearned_premium_reserve),
            net_premium_earned: m(ta.net_premium_earned),
            commission: m(ta.commission),
            claims_paid: m(ta.claims_paid),
            claims_reserved: m(ta.claims_reserve_change),
            ibnr: m(ta.ibnr_total),
            claims_incurred: m(ta.net_claims_incurred),
            operating_expenses: m(ta.operating_expenses),
            underwriting_result: m(ta.underwriting_result),
            ratios: ta.ratios,
        }
    }

    pub fn export_rows(&self) -> Vec<ExportRow> {
        let mut rows: Vec<ExportRow> = self
            .gwp_by_channel
            .iter()
            .map(|line| ExportRow::amount(format!("GWP - {}", line.channel.label()), line.gross_written_premium))
            .collect();
        rows.extend([
            ExportRow::amount("Gross written premium", self.gross_written_premium),
            ExportRow::deduction("Premium ceded", self.ceded_premium),
            ExportRow::amount("Net written premium", self.net_written_premium),
            ExportRow::deduction("Change in UPR", self.change_in_unearned_premium),
            ExportRow::amount("Net premium earned", self.net_premium_earned),
            ExportRow::deduction("Commission", self.commission),
            ExportRow::deduction("Claims paid", self.claims_paid),
            ExportRow::deduction("Claims reserved", self.claims_reserved),
            ExportRow::deduction("IBNR", self.ibnr),
            ExportRow::deduction("Claims incurred", self.claims_incurred),
            ExportRow::deduction("Operating expenses", self.operating_expenses),
            ExportRow::amount("Underwriting result", self.underwriting_result),
            ExportRow::ratio("Loss ratio", self.ratios.loss_ratio),
            ExportRow::ratio("Commission ratio", self.ratios.commission_ratio),
            ExportRow::ratio("Expense ratio", self.ratios.expense_ratio),
            ExportRow::ratio("Combined ratio", self.ratios.combined_ratio),
        ]);
        rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolvencyStatus {
    NoData,
    Solvent,
    Warning,
    Insufficient,
}

impl SolvencyStatus {
    pub fn classify(min_capital_requirement: f64, solvency_ratio: f64) -> Self {
        if min_capital_requirement <= 0.0 {
            SolvencyStatus::NoData
        } else if solvency_ratio >= SOLVENT_THRESHOLD_PCT {
            SolvencyStatus::Solvent
        } else if solvency_ratio >= WARNING_THRESHOLD_PCT {
            SolvencyStatus::Warning
        } else {
            SolvencyStatus::Insufficient
        }
    }
}

/// Form 2: solvency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolvencyForm {
    pub total_assets: Money,
    pub total_liabilities: Money,
    pub net_assets: Money,
    pub min_capital_requirement: Money,
    pub solvency_margin: Money,
    pub solvency_ratio: f64,
    pub status: SolvencyStatus,
}

impl SolvencyForm {
    pub fn build(inputs: &SolvencyInputs, secondary: Option<&SecondaryCurrency>) -> Self {
        let m = |amount: f64| Money::new(amount, secondary);
        let net_assets = inputs.total_assets - inputs.total_liabilities;
        let requirement = inputs.min_capital_requirement;
        let solvency_ratio = if requirement > 0.0 {
            net_assets * 100.0 / requirement
        } else {
            0.0
        };

        Self {
            total_assets: m(inputs.total_assets),
            total_liabilities: m(inputs.total_liabilities),
            net_assets: m(net_assets),
            min_capital_requirement: m(requirement),
            solvency_margin: m(net_assets - requirement),
            solvency_ratio,
            status: SolvencyStatus::classify(requirement, solvency_ratio),
        }
    }

    pub fn export_rows(&self) -> Vec<ExportRow> {
        vec![
            ExportRow::amount("Total assets", self.total_assets),
            ExportRow::deduction("Total liabilities", self.total_liabilities),
            ExportRow::amount("Net assets", self.net_assets),
            ExportRow::amount("Minimum capital requirement", self.min_capital_requirement),
            ExportRow::amount("Solvency margin", self.solvency_margin),
            ExportRow::ratio("Solvency ratio", self.solvency_ratio),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReserveLine {
    pub class_of_business: String,
    pub unearned_premium: Money,
    pub outstanding_claims: Money,
    pub ibnr: Money,
    pub total: Money,
}

/// Form 3: technical reserves by class of business
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservesForm {
    pub lines: Vec<ReserveLine>,
    pub total: ReserveLine,
}

pub const RESERVES_TOTAL_LABEL: &str = "Total";

impl ReservesForm {
    pub fn build(
        summary: &AnalyticsSummary,
        ibnr_by_class: &BTreeMap<String, f64>,
        secondary: Option<&SecondaryCurrency>,
    ) -> Self {
        let m = |amount: f64| Money::new(amount, secondary);

        let mut classes: BTreeSet<&String> = summary.unearned_premium_by_class.keys().collect();
        classes.extend(summary.claims.by_class.keys());
        classes.extend(ibnr_by_class.keys());

        let mut sums = (0.0, 0.0, 0.0);
        let lines: Vec<ReserveLine> = classes
            .into_iter()
            .map(|class| {
                let upr = summary.unearned_premium_by_class.get(class).copied().unwrap_or(0.0);
                let outstanding = summary.claims.by_class.get(class).map(|c| c.reserve).unwrap_or(0.0);
                let ibnr = ibnr_by_class.get(class).copied().unwrap_or(0.0);
                sums.0 += upr;
                sums.1 += outstanding;
                sums.2 += ibnr;
                ReserveLine {
                    class_of_business: class.clone(),
                    unearned_premium: m(upr),
                    outstanding_claims: m(outstanding),
                    ibnr: m(ibnr),
                    total: m(upr + outstanding + ibnr),
                }
            })
            .collect();

        let total = ReserveLine {
            class_of_business: RESERVES_TOTAL_LABEL.to_string(),
            unearned_premium: m(sums.0),
            outstanding_claims: m(sums.1),
            ibnr: m(sums.2),
            total: m(sums.0 + sums.1 + sums.2),
        };

        Self { lines, total }
    }

    pub fn export_rows(&self) -> Vec<ExportRow> {
        self.lines
            .iter()
            .chain(std::iter::once(&self.total))
            .flat_map(|line| {
                let class = &line.class_of_business;
                [
                    ExportRow::amount(format!("{} - UPR", class), line.unearned_premium),
                    ExportRow::amount(format!("{} - Outstanding claims", class), line.outstanding_claims),
                    ExportRow::amount(format!("{} - IBNR", class), line.ibnr),
                    ExportRow::amount(format!("{} - Total reserves", class), line.total),
                ]
            })
            .collect()
    }
}

/// Form 4: reinsurance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReinsuranceForm {
    /// Outward written premium; the authoritative ceded figure
    pub total_ceded: Money,
    pub proportional: Money,
    pub non_proportional: Money,
    pub facultative: Money,
    /// Ceded premium not covered by the manual split (negative when over-allocated)
    pub unallocated: Money,
    pub recoveries: Money,
    pub net_reinsurance_position: Money,
    pub cession_ratio: f64,
    pub contract_count: u32,
    pub top_reinsurers: Vec<String>,
}

impl ReinsuranceForm {
    pub fn build(
        summary: &AnalyticsSummary,
        inputs: &ReinsuranceInputs,
        secondary: Option<&SecondaryCurrency>,
    ) -> Self {
        let m = |amount: f64| Money::new(amount, secondary);
        let ceded = summary.total.ceded_premium;

        // A manual list replaces the ranking derived from outward records
        let top_reinsurers = if inputs.top_reinsurers.is_empty() {
            summary.top_reinsurers.iter().map(|r| r.name.clone()).collect()
        } else {
            inputs.top_reinsurers.clone()
        };

        Self {
            total_ceded: m(ceded),
            proportional: m(inputs.proportional),
            non_proportional: m(inputs.non_proportional),
            facultative: m(inputs.facultative),
            unallocated: m(ceded - inputs.split_total()),
            recoveries: m(inputs.recoveries),
            net_reinsurance_position: m(ceded - inputs.recoveries),
            cession_ratio: percent(ceded, summary.total.gross_written_premium),
            contract_count: inputs.contract_count,
            top_reinsurers,
        }
    }

    pub fn export_rows(&self) -> Vec<ExportRow> {
        let mut rows = vec![
            ExportRow::amount("Total ceded premium", self.total_ceded),
            ExportRow::amount("Proportional", self.proportional),
            ExportRow::amount("Non-proportional", self.non_proportional),
            ExportRow::amount("Facultative", self.facultative),
            ExportRow::amount("Unallocated", self.unallocated),
            ExportRow::deduction("Reinsurance recoveries", self.recoveries),
            ExportRow::amount("Net reinsurance position", self.net_reinsurance_position),
            ExportRow::ratio("Cession ratio", self.cession_ratio),
            ExportRow::note("Contract count", self.contract_count.to_string()),
        ];
        rows.extend(
            self.top_reinsurers
                .iter()
                .enumerate()
                .map(|(i, name)| ExportRow::note(format!("Reinsurer #{}", i + 1), name.as_str())),
        );
        rows
    }
}
