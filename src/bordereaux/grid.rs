//! Tokenized spreadsheet grid handed over by the external reader

use crate::error::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// One spreadsheet cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Numeric value with blank or non-numeric cells coerced to 0
    pub fn as_amount(&self) -> f64 {
        match self {
            Cell::Number(n) if n.is_finite() => *n,
            Cell::Text(s) => parse_number(s).unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Empty => String::new(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

/// Parse a number the way spreadsheet exports write them.
///
/// Thousands separators, spaces, non-breaking spaces and `$`/`€`/`%` are
/// stripped; an empty string or a lone `-` is not a number.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '\u{a0}' | '$' | '€' | '%'))
        .collect();

    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Header row plus data rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetGrid {
    pub rows: Vec<Vec<Cell>>,
}

impl SheetGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Build a grid from string rows
    pub fn from_strings<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|row| row.iter().map(|c| Cell::from(c.as_ref())).collect())
                .collect(),
        }
    }

    /// Tokenize CSV content into a grid; the first record is the header row
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result.map_err(|e| AnalyticsError::ParseFailure(e.to_string()))?;
            rows.push(record.iter().map(Cell::from).collect());
        }
        Ok(Self { rows })
    }

    pub fn header(&self) -> Option<&[Cell]> {
        self.rows.first().map(Vec::as_slice)
    }

    pub fn data_rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().skip(1).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_cleanup() {
        assert_eq!(parse_number("1,234.50"), Some(1234.5));
        assert_eq!(parse_number(" $ 1 000 "), Some(1000.0));
        assert_eq!(parse_number("12\u{a0}500"), Some(12500.0));
        assert_eq!(parse_number("€99"), Some(99.0));
        assert_eq!(parse_number("15%"), Some(15.0));
        assert_eq!(parse_number("-250"), Some(-250.0));
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn test_cell_amount_coercion() {
        assert_eq!(Cell::Empty.as_amount(), 0.0);
        assert_eq!(Cell::Text("abc".into()).as_amount(), 0.0);
        assert_eq!(Cell::Text("2,000".into()).as_amount(), 2000.0);
        assert_eq!(Cell::Number(f64::NAN).as_amount(), 0.0);
        assert!(Cell::Text("   ".into()).is_empty());
    }

    #[test]
    fn test_grid_from_csv() {
        let data = "Period,GWP\nQ1,\"1,000\"\nQ2\n";
        let grid = SheetGrid::from_csv_reader(data.as_bytes()).unwrap();
        assert_eq!(grid.rows.len(), 3);
        assert_eq!(grid.header().unwrap()[1], Cell::Text("GWP".into()));
        assert_eq!(grid.rows[1][1].as_amount(), 1000.0);
        assert_eq!(grid.rows[2].len(), 1);
    }
}
