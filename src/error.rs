//! Error taxonomy shared by every analytics component

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Upstream record fetch failed. Never papered over with zeros.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// Bordereaux file could not be read; caller falls back to manual entry.
    #[error("could not parse bordereaux file: {0}")]
    ParseFailure(String),

    #[error("no exchange rate for {currency} on or before {date}")]
    RateUnavailable { currency: String, date: NaiveDate },

    /// Malformed override input, rejected before persistence.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Settings write failed after the in-memory override was applied.
    #[error("settings write failed: {0}")]
    SettingsWrite(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyticsError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        AnalyticsError::DataUnavailable(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        AnalyticsError::ValidationError(message.into())
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
