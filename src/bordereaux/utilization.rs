//! MGA agreement utilization scoring
//!
//! Actual GWP is recognized only from ACCEPTED bordereaux. Utilization is
//! undefined (reported "N/A") when the agreement has no positive EPI.

use crate::records::{BindingAgreement, BordereauxEntry};
use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Direction of the two most recent accepted bordereaux
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Flat,
    /// Fewer than two accepted entries
    Undetermined,
}

/// Scored performance of one binding agreement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementUtilization {
    pub agreement_id: String,
    pub epi: f64,
    pub actual_gwp: f64,
    /// Percentage of EPI written; None when EPI <= 0
    pub utilization: Option<f64>,
    /// 1 to 5 stars
    pub score: u8,
    pub trend: Trend,
    pub months_elapsed: u32,
    /// Months over three, not rounded; at least 1
    pub quarters_elapsed: f64,
    pub avg_quarterly_gwp: f64,
    pub accepted_entries: usize,
}

impl AgreementUtilization {
    /// Utilization for display, "N/A" when undefined
    pub fn display(&self) -> String {
        match self.utilization {
            Some(pct) => format!("{:.1}%", pct),
            None => "N/A".to_string(),
        }
    }
}

/// Σ totalGwp over accepted entries of the agreement
pub fn actual_gwp(agreement_id: &str, entries: &[BordereauxEntry]) -> f64 {
    entries
        .iter()
        .filter(|e| e.agreement_id == agreement_id && e.is_recognized())
        .map(|e| e.total_gwp)
        .sum()
}

/// Star score for a utilization percentage
pub fn score_for(utilization: f64) -> u8 {
    if utilization >= 90.0 {
        5
    } else if utilization >= 75.0 {
        4
    } else if utilization >= 50.0 {
        3
    } else if utilization >= 25.0 {
        2
    } else {
        1
    }
}

fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt().map_or(true, |next| next.month() != date.month())
}

/// Whole calendar months from `start` to `end`, never negative
pub fn whole_months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    // A month counts once its anniversary has passed; the anniversary of a
    // day missing from the end month is that month's last day
    if end.day() < start.day() && !is_month_end(end) {
        months -= 1;
    }
    months.max(0) as u32
}

/// Trend between the two latest accepted entries by period start
pub fn trend(agreement_id: &str, entries: &[BordereauxEntry]) -> Trend {
    let mut accepted: Vec<&BordereauxEntry> = entries
        .iter()
        .filter(|e| e.agreement_id == agreement_id && e.is_recognized())
        .collect();

    if accepted.len() < 2 {
        return Trend::Undetermined;
    }

    // Stable sort keeps submission order for entries sharing a period start
    accepted.sort_by_key(|e| e.period_from);
    let previous = accepted[accepted.len() - 2].total_gwp;
    let latest = accepted[accepted.len() - 1].total_gwp;

    match latest.partial_cmp(&previous) {
        Some(Ordering::Greater) => Trend::Up,
        Some(Ordering::Less) => Trend::Down,
        _ => Trend::Flat,
    }
}

/// Score one agreement from its bordereaux history as of `today`
pub fn compute_utilization(
    agreement: &BindingAgreement,
    entries: &[BordereauxEntry],
    today: NaiveDate,
) -> AgreementUtilization {
    let id = agreement.agreement_id.as_str();
    let actual = actual_gwp(id, entries);

    let utilization = if agreement.epi > 0.0 {
        Some(actual / agreement.epi * 100.0)
    } else {
        None
    };
    // No EPI means nothing to measure against: lowest score
    let score = utilization.map(score_for).unwrap_or(1);

    let months_elapsed = whole_months_between(agreement.inception_date, today);
    let quarters_elapsed = (months_elapsed as f64 / 3.0).max(1.0);
    let avg_quarterly_gwp = actual / quarters_elapsed;

    AgreementUtilization {
        agreement_id: agreement.agreement_id.clone(),
        epi: agreement.epi,
        actual_gwp: actual,
        utilization,
        score,
        trend: trend(id, entries),
        months_elapsed,
        quarters_elapsed,
        avg_quarterly_gwp,
        accepted_entries: entries
            .iter()
            .filter(|e| e.agreement_id == id && e.is_recognized())
            .count(),
    }
}

/// Score many agreements in parallel, preserving input order
pub fn score_agreements(
    agreements: &[BindingAgreement],
    entries: &[BordereauxEntry],
    today: NaiveDate,
) -> Vec<AgreementUtilization> {
    agreements
        .par_iter()
        .map(|agreement| compute_utilization(agreement, entries, today))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{AgreementStatus, BordereauxStatus, BordereauxType};
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn agreement(epi: f64) -> BindingAgreement {
        BindingAgreement {
            agreement_id: "MGA-1".into(),
            name: "Silk Road Underwriting".into(),
            epi,
            our_share: 1.0,
            currency: "UZS".into(),
            status: AgreementStatus::Active,
            inception_date: date(2024, 1, 15),
        }
    }

    fn entry(id: &str, from: NaiveDate, gwp: f64, status: BordereauxStatus) -> BordereauxEntry {
        BordereauxEntry {
            entry_id: id.into(),
            agreement_id: "MGA-1".into(),
            kind: BordereauxType::Premium,
            period_from: from,
            period_to: from,
            status,
            total_gwp: gwp,
            total_policies: 10,
            total_claims_paid: 0.0,
            total_claims_reserved: 0.0,
        }
    }

    #[test]
    fn test_only_accepted_entries_count() {
        let entries = vec![
            entry("b1", date(2024, 1, 1), 400.0, BordereauxStatus::Accepted),
            entry("b2", date(2024, 4, 1), 300.0, BordereauxStatus::Pending),
            entry("b3", date(2024, 7, 1), 200.0, BordereauxStatus::Rejected),
            entry("b4", date(2024, 7, 1), 100.0, BordereauxStatus::Disputed),
        ];
        assert_eq!(actual_gwp("MGA-1", &entries), 400.0);
        assert_eq!(actual_gwp("MGA-2", &entries), 0.0);
    }

    #[test]
    fn test_accepting_pending_entry_adds_its_gwp() {
        let mut entries = vec![
            entry("b1", date(2024, 1, 1), 400.0, BordereauxStatus::Accepted),
            entry("b2", date(2024, 4, 1), 275.5, BordereauxStatus::Pending),
        ];
        let before = actual_gwp("MGA-1", &entries);

        entries[1].status = BordereauxStatus::Accepted;
        assert_eq!(actual_gwp("MGA-1", &entries), before + 275.5);

        entries[1].status = BordereauxStatus::Pending;
        assert_eq!(actual_gwp("MGA-1", &entries), before);
    }

    #[test]
    fn test_score_thresholds() {
        assert_eq!(score_for(95.0), 5);
        assert_eq!(score_for(90.0), 5);
        assert_eq!(score_for(89.99), 4);
        assert_eq!(score_for(75.0), 4);
        assert_eq!(score_for(50.0), 3);
        assert_eq!(score_for(25.0), 2);
        assert_eq!(score_for(24.9), 1);
        assert_eq!(score_for(0.0), 1);
    }

    #[test]
    fn test_zero_epi_is_not_applicable() {
        let entries = vec![entry("b1", date(2024, 1, 1), 400.0, BordereauxStatus::Accepted)];
        let result = compute_utilization(&agreement(0.0), &entries, date(2024, 7, 15));
        assert!(result.utilization.is_none());
        assert_eq!(result.display(), "N/A");
        assert_eq!(result.score, 1);
        assert_eq!(result.actual_gwp, 400.0);
    }

    #[test]
    fn test_utilization_and_quarterly_average() {
        let entries = vec![
            entry("b1", date(2024, 1, 1), 300.0, BordereauxStatus::Accepted),
            entry("b2", date(2024, 4, 1), 500.0, BordereauxStatus::Accepted),
        ];
        // Inception 2024-01-15 to 2024-10-20: 9 whole months, 3 quarters
        let result = compute_utilization(&agreement(1_000.0), &entries, date(2024, 10, 20));
        assert_relative_eq!(result.utilization.unwrap(), 80.0, epsilon = 1e-9);
        assert_eq!(result.score, 4);
        assert_eq!(result.months_elapsed, 9);
        assert_relative_eq!(result.quarters_elapsed, 3.0);
        assert_relative_eq!(result.avg_quarterly_gwp, 800.0 / 3.0, epsilon = 1e-9);
        assert_eq!(result.trend, Trend::Up);
        assert_eq!(result.display(), "80.0%");
    }

    #[test]
    fn test_quarters_floor_at_one() {
        let entries = vec![entry("b1", date(2024, 1, 1), 600.0, BordereauxStatus::Accepted)];
        let result = compute_utilization(&agreement(1_000.0), &entries, date(2024, 2, 1));
        assert_eq!(result.months_elapsed, 0);
        assert_eq!(result.quarters_elapsed, 1.0);
        assert_eq!(result.avg_quarterly_gwp, 600.0);
    }

    #[test]
    fn test_partial_quarters_are_not_truncated() {
        let mut a = agreement(5_000.0);
        a.inception_date = date(2024, 1, 1);
        let entries = vec![entry("b1", date(2024, 1, 1), 1_000.0, BordereauxStatus::Accepted)];

        let result = compute_utilization(&a, &entries, date(2024, 11, 1));
        assert_eq!(result.months_elapsed, 10);
        assert_relative_eq!(result.quarters_elapsed, 10.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(result.avg_quarterly_gwp, 300.0, epsilon = 1e-9);

        let result = compute_utilization(&a, &entries, date(2024, 5, 1));
        assert_eq!(result.months_elapsed, 4);
        assert_relative_eq!(result.avg_quarterly_gwp, 750.0, epsilon = 1e-9);
    }

    #[test]
    fn test_whole_months() {
        assert_eq!(whole_months_between(date(2024, 1, 15), date(2024, 2, 14)), 0);
        assert_eq!(whole_months_between(date(2024, 1, 15), date(2024, 2, 15)), 1);
        assert_eq!(whole_months_between(date(2024, 5, 1), date(2024, 1, 1)), 0);
    }

    #[test]
    fn test_month_end_inception_completes_in_shorter_months() {
        assert_eq!(whole_months_between(date(2024, 1, 31), date(2024, 2, 29)), 1);
        assert_eq!(whole_months_between(date(2024, 1, 31), date(2024, 2, 28)), 0);
        assert_eq!(whole_months_between(date(2023, 1, 31), date(2023, 2, 28)), 1);
        assert_eq!(whole_months_between(date(2024, 1, 31), date(2024, 4, 30)), 3);
        assert_eq!(whole_months_between(date(2024, 1, 31), date(2024, 4, 29)), 2);
        assert_eq!(whole_months_between(date(2023, 11, 30), date(2024, 2, 29)), 3);
    }

    #[test]
    fn test_trend_uses_latest_two_by_period() {
        let entries = vec![
            entry("late", date(2024, 7, 1), 100.0, BordereauxStatus::Accepted),
            entry("early", date(2024, 1, 1), 900.0, BordereauxStatus::Accepted),
            entry("mid", date(2024, 4, 1), 250.0, BordereauxStatus::Accepted),
            entry("ignored", date(2024, 10, 1), 5_000.0, BordereauxStatus::Pending),
        ];
        assert_eq!(trend("MGA-1", &entries), Trend::Down);

        let flat = vec![
            entry("a", date(2024, 1, 1), 100.0, BordereauxStatus::Accepted),
            entry("b", date(2024, 4, 1), 100.0, BordereauxStatus::Accepted),
        ];
        assert_eq!(trend("MGA-1", &flat), Trend::Flat);

        let single = vec![entry("a", date(2024, 1, 1), 100.0, BordereauxStatus::Accepted)];
        assert_eq!(trend("MGA-1", &single), Trend::Undetermined);
    }

    #[test]
    fn test_batch_preserves_order() {
        let mut second = agreement(2_000.0);
        second.agreement_id = "MGA-2".into();
        let entries = vec![entry("b1", date(2024, 1, 1), 500.0, BordereauxStatus::Accepted)];

        let results = score_agreements(&[agreement(1_000.0), second], &entries, date(2024, 7, 1));
        assert_eq!(results[0].agreement_id, "MGA-1");
        assert_eq!(results[1].agreement_id, "MGA-2");
        assert_eq!(results[1].actual_gwp, 0.0);
    }
}
