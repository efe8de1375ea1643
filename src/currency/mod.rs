//! Currency normalization against a historical rate table
//!
//! Lookups prefer an exact-date quote, then the most recent quote dated on or
//! before the requested date. A miss never fails: the amount passes through
//! unchanged and the result is flagged as unconverted.

mod sync;

pub use sync::{cached_rates, sync_rates, CachedRates, CsvRateSource, RateSource, RateSyncOutcome};

use crate::records::ExchangeRate;
use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rates indexed by currency, each list sorted by date ascending
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    by_currency: HashMap<String, Vec<ExchangeRate>>,
}

impl RateTable {
    pub fn new(rates: impl IntoIterator<Item = ExchangeRate>) -> Self {
        let mut table = Self::default();
        table.extend(rates);
        table
    }

    /// Add quotes; a later quote for an existing date supersedes the earlier one
    pub fn extend(&mut self, rates: impl IntoIterator<Item = ExchangeRate>) {
        for rate in rates {
            let quotes = self.by_currency.entry(rate.currency.to_uppercase()).or_default();
            match quotes.binary_search_by(|q| q.date.cmp(&rate.date)) {
                Ok(idx) => quotes[idx] = rate,
                Err(idx) => quotes.insert(idx, rate),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_currency.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exact-date quote, else the latest quote dated on or before `date`
    pub fn lookup(&self, currency: &str, date: NaiveDate) -> Option<&ExchangeRate> {
        let quotes = self.by_currency.get(&currency.to_uppercase())?;
        let idx = quotes.partition_point(|q| q.date <= date);
        if idx == 0 {
            None
        } else {
            Some(&quotes[idx - 1])
        }
    }

    /// Most recent cached quote regardless of date
    pub fn latest_cached(&self, currency: &str) -> Option<&ExchangeRate> {
        self.by_currency.get(&currency.to_uppercase()).and_then(|q| q.last())
    }

    pub fn all(&self) -> impl Iterator<Item = &ExchangeRate> {
        self.by_currency.values().flatten()
    }

    /// Currencies with at least one quote, sorted
    pub fn currencies(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.by_currency.keys().cloned().collect();
        codes.sort();
        codes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    /// Already in the base currency
    Base,
    /// Converted with a stored rate
    Converted,
    /// No usable rate; amount passed through unchanged
    Unconverted,
}

/// Result of a base-currency conversion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Converted {
    pub amount: f64,
    /// Per-unit rate applied (1.0 for identity and pass-through)
    pub rate: f64,
    pub status: ConversionStatus,
}

impl Converted {
    pub fn is_unconverted(&self) -> bool {
        self.status == ConversionStatus::Unconverted
    }
}

/// Converts amounts into the base reporting currency
#[derive(Debug, Clone)]
pub struct CurrencyNormalizer {
    base: String,
    rates: RateTable,
}

impl CurrencyNormalizer {
    pub fn new(base: &str, rates: RateTable) -> Self {
        Self {
            base: base.trim().to_uppercase(),
            rates,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    pub fn is_base(&self, currency: &str) -> bool {
        currency.trim().eq_ignore_ascii_case(&self.base)
    }

    /// Convert `amount` in `currency` to the base currency as of `as_of`
    pub fn to_base(&self, amount: f64, currency: &str, as_of: NaiveDate) -> Converted {
        if self.is_base(currency) {
            return Converted { amount, rate: 1.0, status: ConversionStatus::Base };
        }

        match self.rates.lookup(currency.trim(), as_of) {
            Some(quote) => {
                let rate = quote.per_unit();
                Converted { amount: amount * rate, rate, status: ConversionStatus::Converted }
            }
            None => {
                warn!("No {} rate on or before {}; amount left unconverted", currency, as_of);
                Converted { amount, rate: 1.0, status: ConversionStatus::Unconverted }
            }
        }
    }
}
