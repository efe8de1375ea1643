//! Bordereaux ingestion and MGA agreement performance

mod grid;
mod mapper;
pub mod utilization;

pub use grid::{parse_number, Cell, SheetGrid};
pub use mapper::{detect_columns, normalize_header, parse_bordereaux_file, Metric, ParsedBordereaux};
pub use utilization::{compute_utilization, score_agreements, AgreementUtilization, Trend};
