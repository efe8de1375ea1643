//! Manual overrides: operating expenses, IBNR by class, solvency and reinsurance inputs
//!
//! Overrides are a typed object handed explicitly to the ratio engine and the
//! form composer. IBNR is a flat per-class figure, never derived from claims.

mod repository;

pub use repository::{InMemorySettings, JsonFileSettings, SettingKey, SettingsRepository};

use crate::error::{AnalyticsError, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Balance-sheet inputs for the solvency form
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SolvencyInputs {
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub min_capital_requirement: f64,
}

impl SolvencyInputs {
    pub fn validate(&self) -> Result<()> {
        non_negative("total_assets", self.total_assets)?;
        non_negative("total_liabilities", self.total_liabilities)?;
        non_negative("min_capital_requirement", self.min_capital_requirement)
    }
}

/// Manual reinsurance programme split
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReinsuranceInputs {
    pub proportional: f64,
    pub non_proportional: f64,
    pub facultative: f64,
    pub recoveries: f64,
    pub contract_count: u32,
    #[serde(default)]
    pub top_reinsurers: Vec<String>,
}

impl ReinsuranceInputs {
    pub fn validate(&self) -> Result<()> {
        non_negative("proportional", self.proportional)?;
        non_negative("non_proportional", self.non_proportional)?;
        non_negative("facultative", self.facultative)?;
        non_negative("recoveries", self.recoveries)?;
        if self.top_reinsurers.iter().any(|name| name.trim().is_empty()) {
            return Err(AnalyticsError::invalid("top_reinsurers contains a blank name"));
        }
        Ok(())
    }

    /// Sum of the manual split
    pub fn split_total(&self) -> f64 {
        self.proportional + self.non_proportional + self.facultative
    }
}

fn non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AnalyticsError::invalid(format!(
            "{} must be a non-negative amount, got {}",
            field, value
        )));
    }
    Ok(())
}

fn validate_ibnr(ibnr: &BTreeMap<String, f64>) -> Result<()> {
    for (class, amount) in ibnr {
        if class.trim().is_empty() {
            return Err(AnalyticsError::invalid("IBNR class name is blank"));
        }
        non_negative(&format!("ibnr[{}]", class), *amount)?;
    }
    Ok(())
}

/// Every manual override the engine consumes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overrides {
    pub operating_expenses: f64,
    pub ibnr_by_class: BTreeMap<String, f64>,
    pub solvency: SolvencyInputs,
    pub reinsurance: ReinsuranceInputs,
}

impl Overrides {
    pub fn validate(&self) -> Result<()> {
        non_negative("operating_expenses", self.operating_expenses)?;
        validate_ibnr(&self.ibnr_by_class)?;
        self.solvency.validate()?;
        self.reinsurance.validate()
    }

    /// Read every override from the repository; absent keys keep defaults
    pub fn load(repo: &dyn SettingsRepository) -> Result<Self> {
        let mut overrides = Overrides::default();

        if let Some(raw) = repo.get(SettingKey::OperatingExpenses)? {
            overrides.operating_expenses = raw.trim().parse().map_err(|_| {
                AnalyticsError::invalid(format!("operating_expenses is not a number: {}", raw))
            })?;
        }
        if let Some(raw) = repo.get(SettingKey::IbnrByClass)? {
            overrides.ibnr_by_class = decode(SettingKey::IbnrByClass, &raw)?;
        }
        if let Some(raw) = repo.get(SettingKey::Solvency)? {
            overrides.solvency = decode(SettingKey::Solvency, &raw)?;
        }
        if let Some(raw) = repo.get(SettingKey::Reinsurance)? {
            overrides.reinsurance = decode(SettingKey::Reinsurance, &raw)?;
        }

        overrides.validate()?;
        Ok(overrides)
    }
}

fn decode<T: serde::de::DeserializeOwned>(key: SettingKey, raw: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| AnalyticsError::invalid(format!("{} is malformed: {}", key.as_str(), e)))
}

/// Overrides held for a session, written through to a repository.
///
/// Input is validated before anything changes. Once valid, the in-memory value
/// is updated first; a failed write is reported but the session keeps it.
pub struct SettingsSession<R: SettingsRepository> {
    overrides: Overrides,
    repo: R,
}

impl<R: SettingsRepository> SettingsSession<R> {
    /// Open a session with the overrides currently stored in `repo`
    pub fn open(repo: R) -> Result<Self> {
        let overrides = Overrides::load(&repo)?;
        Ok(Self { overrides, repo })
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn set_operating_expenses(&mut self, amount: f64) -> Result<()> {
        non_negative("operating_expenses", amount)?;
        self.overrides.operating_expenses = amount;
        self.persist(SettingKey::OperatingExpenses, amount.to_string())
    }

    pub fn set_ibnr(&mut self, ibnr_by_class: BTreeMap<String, f64>) -> Result<()> {
        validate_ibnr(&ibnr_by_class)?;
        let raw = serde_json::to_string(&ibnr_by_class)?;
        self.overrides.ibnr_by_class = ibnr_by_class;
        self.persist(SettingKey::IbnrByClass, raw)
    }

    pub fn set_solvency(&mut self, solvency: SolvencyInputs) -> Result<()> {
        solvency.validate()?;
        let raw = serde_json::to_string(&solvency)?;
        self.overrides.solvency = solvency;
        self.persist(SettingKey::Solvency, raw)
    }

    pub fn set_reinsurance(&mut self, reinsurance: ReinsuranceInputs) -> Result<()> {
        reinsurance.validate()?;
        let raw = serde_json::to_string(&reinsurance)?;
        self.overrides.reinsurance = reinsurance;
        self.persist(SettingKey::Reinsurance, raw)
    }

    fn persist(&mut self, key: SettingKey, raw: String) -> Result<()> {
        self.repo.set(key, &raw).map_err(|e| {
            warn!("Keeping {} in memory after failed write: {}", key.as_str(), e);
            match e {
                AnalyticsError::SettingsWrite(msg) => AnalyticsError::SettingsWrite(msg),
                other => AnalyticsError::SettingsWrite(other.to_string()),
            }
        })
    }
}
