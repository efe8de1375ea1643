//! Typed-key settings persistence
//!
//! Values are opaque strings at this layer; `Overrides` owns their JSON shape.

use crate::error::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Every setting the engine reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SettingKey {
    OperatingExpenses,
    IbnrByClass,
    Solvency,
    Reinsurance,
}

impl SettingKey {
    /// Stable storage key
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::OperatingExpenses => "operating_expenses",
            SettingKey::IbnrByClass => "ibnr_by_class",
            SettingKey::Solvency => "solvency_inputs",
            SettingKey::Reinsurance => "reinsurance_inputs",
        }
    }
}

/// Key/value store for manual overrides; each key is upserted independently
pub trait SettingsRepository {
    fn get(&self, key: SettingKey) -> Result<Option<String>>;
    fn set(&mut self, key: SettingKey, value: &str) -> Result<()>;
}

/// Volatile store, used for tests and single-run CLI sessions
#[derive(Debug, Clone, Default)]
pub struct InMemorySettings {
    values: BTreeMap<SettingKey, String>,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsRepository for InMemorySettings {
    fn get(&self, key: SettingKey) -> Result<Option<String>> {
        Ok(self.values.get(&key).cloned())
    }

    fn set(&mut self, key: SettingKey, value: &str) -> Result<()> {
        self.values.insert(key, value.to_string());
        Ok(())
    }
}

/// Settings kept in a JSON object file: `{"operating_expenses": "1200", ...}`
#[derive(Debug, Clone)]
pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let file = File::open(&self.path)
            .map_err(|e| AnalyticsError::unavailable(format!("{}: {}", self.path.display(), e)))?;
        Ok(serde_json::from_reader(file)?)
    }
}

impl SettingsRepository for JsonFileSettings {
    fn get(&self, key: SettingKey) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key.as_str()))
    }

    fn set(&mut self, key: SettingKey, value: &str) -> Result<()> {
        let mut all = self.read_all()?;
        all.insert(key.as_str().to_string(), value.to_string());
        let body = serde_json::to_string_pretty(&all)?;
        fs::write(&self.path, body)
            .map_err(|e| AnalyticsError::SettingsWrite(format!("{}: {}", self.path.display(), e)))
    }
}
