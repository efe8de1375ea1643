//! Heuristic column mapping for uploaded bordereaux spreadsheets
//!
//! Headers are scanned left to right. A column binds to the first metric, in
//! metric order, that is still unbound and has an alias contained in the
//! normalized header text. First match wins: legacy spreadsheets are expected
//! to map exactly this way, so the rule must stay order-dependent.

use super::grid::SheetGrid;
use crate::error::{AnalyticsError, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric a bordereaux column can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    TotalGwp,
    TotalPolicies,
    TotalClaimsPaid,
    TotalClaimsReserved,
}

impl Metric {
    /// Binding priority when a header could match more than one metric
    pub const ORDER: [Metric; 4] = [
        Metric::TotalGwp,
        Metric::TotalPolicies,
        Metric::TotalClaimsPaid,
        Metric::TotalClaimsReserved,
    ];

    /// Ordered alias list, matched as substrings of the normalized header
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Metric::TotalGwp => &["gwp", "gross written premium", "written premium", "premium"],
            Metric::TotalPolicies => &[
                "policy count",
                "number of policies",
                "no. of policies",
                "policies",
                "risks",
            ],
            Metric::TotalClaimsPaid => &["claims paid", "paid claims", "paid losses", "paid"],
            Metric::TotalClaimsReserved => &[
                "claims reserved",
                "outstanding claims",
                "claims outstanding",
                "reserved",
                "reserve",
                "outstanding",
            ],
        }
    }

    fn matches(&self, normalized_header: &str) -> bool {
        self.aliases().iter().any(|alias| normalized_header.contains(alias))
    }
}

/// Lower-case, underscores as spaces, whitespace collapsed
pub fn normalize_header(text: &str) -> String {
    text.to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Totals extracted from one uploaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedBordereaux {
    pub file_name: String,
    pub row_count: usize,
    pub total_gwp: f64,
    pub total_policies: f64,
    pub total_claims_paid: f64,
    pub total_claims_reserved: f64,
    /// Metric to the header text it was bound to
    pub detected_columns: BTreeMap<Metric, String>,
}

impl ParsedBordereaux {
    /// No column was recognized; the caller must ask for manual entry
    pub fn needs_manual_entry(&self) -> bool {
        self.detected_columns.is_empty()
    }
}

/// Bind header columns to metrics; returns metric -> column index
pub fn detect_columns(header: &[String]) -> BTreeMap<Metric, usize> {
    let mut bound: BTreeMap<Metric, usize> = BTreeMap::new();

    for (idx, raw) in header.iter().enumerate() {
        let normalized = normalize_header(raw);
        if normalized.is_empty() {
            continue;
        }

        let hit = Metric::ORDER
            .iter()
            .find(|metric| !bound.contains_key(*metric) && metric.matches(&normalized));

        if let Some(metric) = hit {
            debug!("Column {} '{}' bound to {:?}", idx, raw, metric);
            bound.insert(*metric, idx);
        }

        if bound.len() == Metric::ORDER.len() {
            break;
        }
    }

    bound
}

/// Map a tokenized spreadsheet to bordereaux totals.
///
/// Fails only when the grid has no usable header row.
pub fn parse_bordereaux_file(grid: &SheetGrid, file_name: &str) -> Result<ParsedBordereaux> {
    let header: Vec<String> = grid
        .header()
        .ok_or_else(|| AnalyticsError::ParseFailure(format!("{}: file is empty", file_name)))?
        .iter()
        .map(|c| c.as_text())
        .collect();

    if header.iter().all(|h| h.trim().is_empty()) {
        return Err(AnalyticsError::ParseFailure(format!(
            "{}: header row is blank",
            file_name
        )));
    }

    let bound = detect_columns(&header);

    let mut totals: BTreeMap<Metric, f64> = BTreeMap::new();
    let mut row_count = 0;

    for row in grid.data_rows() {
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        row_count += 1;

        for (metric, &idx) in &bound {
            let value = row.get(idx).map(|c| c.as_amount()).unwrap_or(0.0);
            *totals.entry(*metric).or_insert(0.0) += value;
        }
    }

    let detected_columns: BTreeMap<Metric, String> = bound
        .iter()
        .map(|(metric, &idx)| (*metric, header[idx].trim().to_string()))
        .collect();

    if detected_columns.is_empty() {
        warn!("{}: no recognizable columns, manual entry required", file_name);
    }

    let total = |metric: Metric| totals.get(&metric).copied().unwrap_or(0.0);

    Ok(ParsedBordereaux {
        file_name: file_name.to_string(),
        row_count,
        total_gwp: total(Metric::TotalGwp),
        total_policies: total(Metric::TotalPolicies),
        total_claims_paid: total(Metric::TotalClaimsPaid),
        total_claims_reserved: total(Metric::TotalClaimsReserved),
        detected_columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bordereaux::Cell;

    #[test]
    fn test_gross_written_premium_column() {
        let grid = SheetGrid::new(vec![
            vec!["Period".into(), "Gross Written Premium".into(), "Policies".into()],
            vec!["2024-Q1".into(), Cell::Number(1500.25), Cell::Number(10.0)],
            vec!["2024-Q2".into(), Cell::Number(2499.75), Cell::Number(12.0)],
        ]);

        let parsed = parse_bordereaux_file(&grid, "q1q2.xlsx").unwrap();
        assert_eq!(parsed.total_gwp, 1500.25 + 2499.75);
        assert_eq!(parsed.total_policies, 22.0);
        assert_eq!(parsed.row_count, 2);
        assert_eq!(
            parsed.detected_columns.get(&Metric::TotalGwp).map(String::as_str),
            Some("Gross Written Premium")
        );
        assert_eq!(
            parsed.detected_columns.get(&Metric::TotalPolicies).map(String::as_str),
            Some("Policies")
        );
        assert!(!parsed.needs_manual_entry());
    }

    #[test]
    fn test_no_recognizable_headers() {
        let grid = SheetGrid::from_strings(&[
            vec!["Insured", "Territory", "Broker"],
            vec!["Acme", "UZ", "Marsh"],
        ]);

        let parsed = parse_bordereaux_file(&grid, "odd.csv").unwrap();
        assert_eq!(parsed.total_gwp, 0.0);
        assert_eq!(parsed.total_policies, 0.0);
        assert_eq!(parsed.total_claims_paid, 0.0);
        assert_eq!(parsed.total_claims_reserved, 0.0);
        assert!(parsed.detected_columns.is_empty());
        assert!(parsed.needs_manual_entry());
    }

    #[test]
    fn test_first_match_wins_left_to_right() {
        // Both columns mention premium; only the leftmost binds to GWP
        let grid = SheetGrid::from_strings(&[
            vec!["Net Premium", "GWP", "Claims Paid", "Paid"],
            vec!["100", "900", "50", "7"],
        ]);

        let parsed = parse_bordereaux_file(&grid, "legacy.csv").unwrap();
        assert_eq!(parsed.detected_columns[&Metric::TotalGwp], "Net Premium");
        assert_eq!(parsed.total_gwp, 100.0);
        assert_eq!(parsed.detected_columns[&Metric::TotalClaimsPaid], "Claims Paid");
        assert_eq!(parsed.total_claims_paid, 50.0);
    }

    #[test]
    fn test_column_binds_at_most_one_metric() {
        // "premium paid" hits GWP first; the paid metric stays unbound
        let bound = detect_columns(&["Premium Paid".to_string()]);
        assert_eq!(bound.len(), 1);
        assert_eq!(bound.get(&Metric::TotalGwp), Some(&0));
    }

    #[test]
    fn test_blank_and_text_cells_coerce_to_zero() {
        let grid = SheetGrid::from_strings(&[
            vec!["gross_written_premium", "Outstanding Claims"],
            vec!["1,000", ""],
            vec!["", ""],
            vec!["n/a", "250.5"],
            vec!["$2,000", "-"],
        ]);

        let parsed = parse_bordereaux_file(&grid, "upload.csv").unwrap();
        assert_eq!(parsed.row_count, 3);
        assert_eq!(parsed.total_gwp, 3000.0);
        assert_eq!(parsed.total_claims_reserved, 250.5);
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(
            parse_bordereaux_file(&SheetGrid::default(), "empty.csv"),
            Err(AnalyticsError::ParseFailure(_))
        ));

        let blank_header = SheetGrid::from_strings(&[vec!["", " "]]);
        assert!(parse_bordereaux_file(&blank_header, "blank.csv").is_err());
    }

    #[test]
    fn test_detected_columns_serialize_as_metric_names() {
        let grid = SheetGrid::from_strings(&[vec!["GWP"], vec!["5"]]);
        let parsed = parse_bordereaux_file(&grid, "a.csv").unwrap();
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["detectedColumns"]["totalGwp"], "GWP");
        assert_eq!(json["totalGwp"], 5.0);
    }
}
