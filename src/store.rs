//! Record retrieval boundary
//!
//! The engine never persists records itself. A `DataStore` hands it immutable
//! snapshots; any failure surfaces as `DataUnavailable`.

use crate::config::AnalyticsConfig;
use crate::currency::RateTable;
use crate::error::{AnalyticsError, Result};
use crate::records::loader;
use crate::records::{
    BindingAgreement, BordereauxEntry, ClaimRecord, ExchangeRate, MonetaryRecord, RecordFilter,
};
use chrono::NaiveDate;
use log::info;
use std::path::Path;

/// Read-only source of booked records
pub trait DataStore {
    fn list_monetary_records(&self, filter: &RecordFilter) -> Result<Vec<MonetaryRecord>>;

    fn list_claims(&self, filter: &RecordFilter) -> Result<Vec<ClaimRecord>>;

    fn list_bordereaux(&self, agreement_id: &str) -> Result<Vec<BordereauxEntry>>;

    fn list_agreements(&self) -> Result<Vec<BindingAgreement>>;

    fn list_exchange_rates(&self) -> Result<Vec<ExchangeRate>>;

    fn get_agreement(&self, agreement_id: &str) -> Result<BindingAgreement> {
        self.list_agreements()?
            .into_iter()
            .find(|a| a.agreement_id == agreement_id)
            .ok_or_else(|| AnalyticsError::unavailable(format!("unknown agreement {}", agreement_id)))
    }

    /// Exact-date quote, else the latest quote on or before `date`
    fn get_exchange_rate(&self, currency: &str, date: NaiveDate) -> Result<Option<ExchangeRate>> {
        let table = RateTable::new(self.list_exchange_rates()?);
        Ok(table.lookup(currency, date).cloned())
    }
}

/// Store backed by vectors, loaded once from a CSV data directory
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    pub records: Vec<MonetaryRecord>,
    pub claims: Vec<ClaimRecord>,
    pub bordereaux: Vec<BordereauxEntry>,
    pub agreements: Vec<BindingAgreement>,
    pub rates: Vec<ExchangeRate>,
}

impl InMemoryStore {
    /// Load every record file from `dir`
    ///
    /// Monetary records and claims are required. Bordereaux, agreements and
    /// rates are optional and default to empty when their file is absent.
    pub fn from_csv_dir(dir: &Path, config: &AnalyticsConfig) -> Result<Self> {
        let store = Self {
            records: loader::load_monetary_records(dir, config)?,
            claims: loader::load_claims(dir)?,
            bordereaux: optional(dir, loader::BORDEREAUX_FILE, loader::load_bordereaux)?,
            agreements: optional(dir, loader::AGREEMENTS_FILE, loader::load_agreements)?,
            rates: optional(dir, loader::EXCHANGE_RATES_FILE, loader::load_exchange_rates)?,
        };
        info!(
            "Loaded {} monetary records, {} claims, {} bordereaux entries, {} agreements, {} rates from {}",
            store.records.len(),
            store.claims.len(),
            store.bordereaux.len(),
            store.agreements.len(),
            store.rates.len(),
            dir.display()
        );
        Ok(store)
    }
}

fn optional<T>(dir: &Path, file: &str, load: fn(&Path) -> Result<Vec<T>>) -> Result<Vec<T>> {
    if dir.join(file).exists() {
        load(dir)
    } else {
        Ok(Vec::new())
    }
}

impl DataStore for InMemoryStore {
    fn list_monetary_records(&self, filter: &RecordFilter) -> Result<Vec<MonetaryRecord>> {
        Ok(self.records.iter().filter(|r| filter.contains(r.booked_on)).cloned().collect())
    }

    fn list_claims(&self, filter: &RecordFilter) -> Result<Vec<ClaimRecord>> {
        Ok(self.claims.iter().filter(|c| filter.contains(c.booked_on)).cloned().collect())
    }

    fn list_bordereaux(&self, agreement_id: &str) -> Result<Vec<BordereauxEntry>> {
        Ok(self
            .bordereaux
            .iter()
            .filter(|e| e.agreement_id == agreement_id)
            .cloned()
            .collect())
    }

    fn list_agreements(&self) -> Result<Vec<BindingAgreement>> {
        Ok(self.agreements.clone())
    }

    fn list_exchange_rates(&self) -> Result<Vec<ExchangeRate>> {
        Ok(self.rates.clone())
    }
}
