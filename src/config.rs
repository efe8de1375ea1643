//! Engine configuration
//!
//! Loaded from a JSON file or environment variables. Every field has a default
//! so a missing file section never blocks a run.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::File;
use std::path::Path;

/// Default base reporting currency
pub const DEFAULT_BASE_CURRENCY: &str = "UZS";

/// Default secondary reporting currency
pub const DEFAULT_SECONDARY_CURRENCY: &str = "USD";

fn default_base_currency() -> String { DEFAULT_BASE_CURRENCY.to_string() }
fn default_secondary_currency() -> String { DEFAULT_SECONDARY_CURRENCY.to_string() }
fn default_top_counterparties() -> usize { 10 }
fn default_domestic_territories() -> Vec<String> {
    vec!["uzbek".to_string(), "uz".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Currency every aggregate is reported in
    #[serde(default = "default_base_currency")]
    pub base_currency: String,

    /// Currency used for the secondary rendering of forms
    #[serde(default = "default_secondary_currency")]
    pub secondary_currency: String,

    /// Flat "today's rate": base units per one secondary unit.
    /// Separate from the historical per-date rate table.
    #[serde(default)]
    pub secondary_rate: Option<f64>,

    /// Length of the top cedant / reinsurer lists
    #[serde(default = "default_top_counterparties")]
    pub top_counterparties: usize,

    /// Lower-case territory tokens that mark inward business as domestic
    #[serde(default = "default_domestic_territories")]
    pub domestic_territories: Vec<String>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            base_currency: default_base_currency(),
            secondary_currency: default_secondary_currency(),
            secondary_rate: None,
            top_counterparties: default_top_counterparties(),
            domestic_territories: default_domestic_territories(),
        }
    }
}

impl AnalyticsConfig {
    /// Load configuration from a JSON file
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    /// Defaults overlaid with ANALYTICS_* environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base) = env::var("ANALYTICS_BASE_CURRENCY") {
            config.base_currency = base.trim().to_uppercase();
        }
        if let Ok(secondary) = env::var("ANALYTICS_SECONDARY_CURRENCY") {
            config.secondary_currency = secondary.trim().to_uppercase();
        }
        config.secondary_rate = env::var("ANALYTICS_SECONDARY_RATE")
            .ok()
            .and_then(|s| s.parse().ok())
            .or(config.secondary_rate);
        config.top_counterparties = env::var("ANALYTICS_TOP_COUNTERPARTIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(config.top_counterparties);

        config
    }

    /// Secondary rendering settings, if a usable flat rate is configured
    pub fn secondary(&self) -> Option<SecondaryCurrency> {
        self.secondary_rate
            .and_then(|rate| SecondaryCurrency::new(&self.secondary_currency, rate))
    }

    /// Whether a territory string denotes domestic business
    pub fn is_domestic_territory(&self, territory: &str) -> bool {
        let lower = territory.trim().to_lowercase();
        if lower.is_empty() {
            return false;
        }
        self.domestic_territories.iter().any(|token| {
            // Two-letter codes must match whole, longer tokens match anywhere
            if token.len() <= 2 {
                lower == *token
            } else {
                lower.contains(token.as_str())
            }
        })
    }
}

/// Caller-supplied flat rate for rendering base figures in a second currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryCurrency {
    pub code: String,
    /// Base units per one secondary unit
    pub rate: f64,
}

impl SecondaryCurrency {
    /// Returns None for a non-positive or non-finite rate
    pub fn new(code: &str, rate: f64) -> Option<Self> {
        if rate.is_finite() && rate > 0.0 {
            Some(Self { code: code.to_uppercase(), rate })
        } else {
            None
        }
    }

    pub fn convert(&self, amount_base: f64) -> f64 {
        amount_base / self.rate
    }
}
