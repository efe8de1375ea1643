//! Technical account lines and named ratios
//!
//! Every ratio with a zero or negative denominator is reported as 0, never
//! NaN or infinity. Amounts stay positive here; `statement_rows` applies the
//! deduction signs.

use super::channels::{percent, PremiumTotals};
use super::claims::ClaimsTotals;
use crate::config::SecondaryCurrency;
use crate::export::{ExportRow, Money};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyRatios {
    pub loss_ratio: f64,
    pub commission_ratio: f64,
    pub expense_ratio: f64,
    pub combined_ratio: f64,
    pub retention_ratio: f64,
    pub earning_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAccount {
    pub gross_written_premium: f64,
    pub ceded_premium: f64,
    pub net_written_premium: f64,
    pub unearned_premium_reserve: f64,
    pub ceded_unearned_premium: f64,
    pub gross_premium_earned: f64,
    pub ceded_premium_earned: f64,
    pub net_premium_earned: f64,
    pub commission: f64,
    pub net_earned_revenue: f64,
    pub claims_paid: f64,
    pub claims_reserve_change: f64,
    pub ibnr_total: f64,
    pub net_claims_incurred: f64,
    pub operating_expenses: f64,
    pub underwriting_result: f64,
    pub ratios: KeyRatios,
}

/// Derive the technical account from channel, claims and expense totals
pub fn compute_technical_account(
    premium: &PremiumTotals,
    claims: &ClaimsTotals,
    operating_expenses: f64,
) -> TechnicalAccount {
    let net_earned_revenue = premium.net_premium_earned - premium.commission;
    let net_claims_incurred = claims.paid + claims.reserve_change + claims.ibnr_total;

    let loss_ratio = percent(net_claims_incurred, premium.gross_premium_earned);
    let expense_ratio = percent(operating_expenses, premium.net_premium_earned);
    let commission_ratio = premium.commission_ratio;

    let ratios = KeyRatios {
        loss_ratio,
        commission_ratio,
        expense_ratio,
        combined_ratio: loss_ratio + commission_ratio + expense_ratio,
        retention_ratio: percent(premium.net_written_premium, premium.gross_written_premium),
        earning_ratio: percent(premium.gross_premium_earned, premium.gross_written_premium),
    };

    TechnicalAccount {
        gross_written_premium: premium.gross_written_premium,
        ceded_premium: premium.ceded_premium,
        net_written_premium: premium.net_written_premium,
        unearned_premium_reserve: premium.unearned_premium_reserve,
        ceded_unearned_premium: premium.ceded_premium - premium.ceded_premium_earned,
        gross_premium_earned: premium.gross_premium_earned,
        ceded_premium_earned: premium.ceded_premium_earned,
        net_premium_earned: premium.net_premium_earned,
        commission: premium.commission,
        net_earned_revenue,
        claims_paid: claims.paid,
        claims_reserve_change: claims.reserve_change,
        ibnr_total: claims.ibnr_total,
        net_claims_incurred,
        operating_expenses,
        underwriting_result: net_earned_revenue - net_claims_incurred - operating_expenses,
        ratios,
    }
}

impl TechnicalAccount {
    /// Profit and loss view as flat rows
    pub fn statement_rows(&self, secondary: Option<&SecondaryCurrency>) -> Vec<ExportRow> {
        let m = |amount: f64| Money::new(amount, secondary);

        vec![
            ExportRow::amount("Gross written premium", m(self.gross_written_premium)),
            ExportRow::deduction("Premium ceded to reinsurers", m(self.ceded_premium)),
            ExportRow::amount("Net written premium", m(self.net_written_premium)),
            ExportRow::deduction("Change in unearned premium reserve", m(self.unearned_premium_reserve)),
            ExportRow::amount("Gross premium earned", m(self.gross_premium_earned)),
            ExportRow::deduction("Reinsurers' share of earned premium", m(self.ceded_premium_earned)),
            ExportRow::amount("Net premium earned", m(self.net_premium_earned)),
            ExportRow::deduction("Commission", m(self.commission)),
            ExportRow::amount("Net earned revenue", m(self.net_earned_revenue)),
            ExportRow::deduction("Claims paid", m(self.claims_paid)),
            ExportRow::deduction("Change in claims reserve", m(self.claims_reserve_change)),
            ExportRow::deduction("IBNR", m(self.ibnr_total)),
            ExportRow::deduction("Net claims incurred", m(self.net_claims_incurred)),
            ExportRow::deduction("Operating expenses", m(self.operating_expenses)),
            ExportRow::amount("Underwriting result", m(self.underwriting_result)),
            ExportRow::ratio("Loss ratio", self.ratios.loss_ratio),
            ExportRow::ratio("Commission ratio", self.ratios.commission_ratio),
            ExportRow::ratio("Expense ratio", self.ratios.expense_ratio),
            ExportRow::ratio("Combined ratio", self.ratios.combined_ratio),
            ExportRow::ratio("Retention ratio", self.ratios.retention_ratio),
            ExportRow::ratio("Earning ratio", self.ratios.earning_ratio),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn premium() -> PremiumTotals {
        PremiumTotals {
            gross_written_premium: 10_000.0,
            unearned_premium_reserve: 2_000.0,
            gross_premium_earned: 8_000.0,
            ceded_premium: 3_000.0,
            ceded_premium_earned: 2_500.0,
            net_written_premium: 7_000.0,
            net_premium_earned: 5_500.0,
            commission: 1_000.0,
            commission_ratio: 10.0,
            reinsurance_commission: 0.0,
        }
    }

    fn claims() -> ClaimsTotals {
        ClaimsTotals {
            paid: 2_000.0,
            reserve_change: 1_500.0,
            ibnr_total: 500.0,
            incurred: 4_000.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_technical_account_lines() {
        let ta = compute_technical_account(&premium(), &claims(), 1_100.0);

        assert_eq!(ta.net_earned_revenue, 4_500.0);
        assert_eq!(ta.net_claims_incurred, 4_000.0);
        assert_eq!(ta.underwriting_result, 4_500.0 - 4_000.0 - 1_100.0);
        assert_eq!(ta.ceded_unearned_premium, 500.0);

        assert_abs_diff_eq!(ta.ratios.loss_ratio, 50.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ta.ratios.expense_ratio, 20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ta.ratios.combined_ratio, 80.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ta.ratios.retention_ratio, 70.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ta.ratios.earning_ratio, 80.0, epsilon = 1e-12);
    }

    #[test]
    fn test_combined_is_sum_of_parts() {
        let mut p = premium();
        p.gross_premium_earned = 7_777.7;
        p.net_premium_earned = 3_333.3;
        p.commission_ratio = 13.37;
        let ta = compute_technical_account(&p, &claims(), 999.9);
        let r = ta.ratios;
        assert_abs_diff_eq!(
            r.combined_ratio,
            r.loss_ratio + r.commission_ratio + r.expense_ratio,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_zero_denominators_yield_zero() {
        let ta = compute_technical_account(&PremiumTotals::default(), &claims(), 500.0);
        assert_eq!(ta.ratios.loss_ratio, 0.0);
        assert_eq!(ta.ratios.expense_ratio, 0.0);
        assert_eq!(ta.ratios.retention_ratio, 0.0);
        assert_eq!(ta.ratios.earning_ratio, 0.0);
        assert!(ta.ratios.combined_ratio.is_finite());
    }

    #[test]
    fn test_negative_earned_premium_yields_zero() {
        let mut p = premium();
        p.gross_premium_earned = -10.0;
        p.net_premium_earned = -50.0;
        let ta = compute_technical_account(&p, &claims(), 100.0);
        assert_eq!(ta.ratios.loss_ratio, 0.0);
        assert_eq!(ta.ratios.expense_ratio, 0.0);
    }

    #[test]
    fn test_statement_signs() {
        let ta = compute_technical_account(&premium(), &claims(), 1_100.0);
        let rows = ta.statement_rows(None);

        let find = |label: &str| rows.iter().find(|r| r.label == label).unwrap();
        assert_eq!(find("Gross written premium").amount_base, Some(10_000.0));
        assert_eq!(find("Premium ceded to reinsurers").amount_base, Some(-3_000.0));
        assert_eq!(find("Operating expenses").amount_base, Some(-1_100.0));
        assert_eq!(find("Underwriting result").amount_base, Some(-600.0));
        assert_eq!(find("Loss ratio").ratio_pct, Some(50.0));

        // Stored aggregates are untouched by presentation
        assert_eq!(ta.ceded_premium, 3_000.0);
    }
}
