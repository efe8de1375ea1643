//! Insurance Analytics - technical account and regulatory reporting engine
//!
//! This library provides:
//! - Currency normalization against a historical rate table
//! - Channel aggregation of direct, inward and outward business
//! - Technical account lines and key ratios
//! - Bordereaux spreadsheet column mapping and MGA utilization scoring
//! - The four statutory regulatory forms with a secondary-currency rendering

pub mod analytics;
pub mod bordereaux;
pub mod config;
pub mod currency;
pub mod error;
pub mod export;
pub mod records;
pub mod regulatory;
pub mod service;
pub mod settings;
pub mod store;

// Re-export commonly used types
pub use analytics::{AnalyticsSummary, TechnicalAccount};
pub use bordereaux::{AgreementUtilization, ParsedBordereaux, SheetGrid};
pub use config::{AnalyticsConfig, SecondaryCurrency};
pub use currency::{CurrencyNormalizer, RateTable};
pub use error::{AnalyticsError, Result};
pub use export::{ExportRow, Money};
pub use regulatory::{RegulatoryForms, ReportingPeriod};
pub use service::AnalyticsService;
pub use settings::{Overrides, SettingsRepository};
pub use store::{DataStore, InMemoryStore};
